//! Immutable router snapshots.
//!
//! The serving router is a frozen view of the route set. Mutations build a
//! fresh snapshot and atomically swap the `Arc` under the table's write
//! lock; requests that captured the old pointer keep serving from it until
//! they finish.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

/// URL prefix under which static assets are exposed.
pub const ASSETS_PREFIX: &str = "/assets/";

/// A frozen pattern → file-path mapping plus the static asset root.
#[derive(Debug, Default)]
pub struct Router {
    routes: FxHashMap<String, String>,
    assets_dir: Option<PathBuf>,
}

impl Router {
    pub fn new(routes: FxHashMap<String, String>, assets_dir: Option<PathBuf>) -> Self {
        Self { routes, assets_dir }
    }

    /// Resolve a normalized request path to the file path serving it.
    pub fn lookup(&self, pattern: &str) -> Option<&str> {
        self.routes.get(pattern).map(String::as_str)
    }

    /// Root directory for `/assets/*` requests, when configured.
    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut routes = FxHashMap::default();
        routes.insert("/about".to_string(), "content/about.html".to_string());
        let router = Router::new(routes, None);

        assert_eq!(router.lookup("/about"), Some("content/about.html"));
        assert_eq!(router.lookup("/missing"), None);
        assert_eq!(router.len(), 1);
    }
}

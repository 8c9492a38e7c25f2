//! Dynamic route table: URL pattern → file path, with rebuild-and-swap.
//!
//! The table owns two things behind one RW lock: the authoritative
//! `pattern → path` map and the immutable [`Router`] snapshot built from it.
//! Every mutation rebuilds the snapshot under the same write lock, so a
//! reader either sees the old router or the new one, never a partial state.

pub mod router;


use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::content::{is_content_path, path as site_path, File, FileStore};
use crate::debug;
pub use router::{Router, ASSETS_PREFIX};

/// Typed route-table failures.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route pattern cannot be empty")]
    EmptyPattern,
    #[error("route {0} already exists")]
    AlreadyExists(String),
    #[error("route {0} not found")]
    NotFound(String),
    #[error("no routes registered for file {0}")]
    NoRoutesForFile(String),
}

/// Normalize a route pattern: non-empty, absolute, `.`/`..` resolved, no
/// trailing slash (the root is `/`). Idempotent.
pub fn normalize_route(route: &str) -> Result<String, RouteError> {
    if route.is_empty() {
        return Err(RouteError::EmptyPattern);
    }
    let clean = site_path::normalize(route);
    if clean.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{clean}"))
    }
}

struct TableInner {
    routes: FxHashMap<String, String>,
    assets_dir: Option<PathBuf>,
    router: Arc<Router>,
    store: Option<Arc<FileStore>>,
}

impl TableInner {
    /// Rebuild the serving snapshot from the current route set and swap it
    /// in. Callers hold the write lock.
    fn swap_router(&mut self) {
        self.router = Arc::new(Router::new(self.routes.clone(), self.assets_dir.clone()));
    }

    /// Register every normalized route of a file, keeping the first entry on
    /// duplicates and skipping invalid patterns.
    fn register_file(&mut self, file: &File) {
        for route in &file.routes {
            let pattern = match normalize_route(route) {
                Ok(p) => p,
                Err(e) => {
                    debug!("routes"; "skipping invalid route {route:?} of {}: {e}", file.path);
                    continue;
                }
            };
            if self.routes.contains_key(&pattern) {
                continue;
            }
            self.routes.insert(pattern, file.path.clone());
        }
    }
}

/// Thread-safe URL pattern → file path mapping serving the HTTP surface.
pub struct RouteTable {
    inner: RwLock<TableInner>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TableInner {
                routes: FxHashMap::default(),
                assets_dir: None,
                router: Arc::new(Router::default()),
                store: None,
            }),
        }
    }

    /// Start from empty and register every content file's routes, plus the
    /// `/assets` prefix rooted at the site's assets directory. Binds the
    /// store handle used by request handlers.
    pub fn initialize(&self, store: Arc<FileStore>) {
        let files = store.get_all_files();
        let assets_dir = store.site_dir().join("assets");

        let mut inner = self.inner.write();
        inner.routes.clear();
        for file in files.values() {
            if is_content_path(&file.path) {
                inner.register_file(file);
            }
        }
        inner.assets_dir = Some(assets_dir);
        inner.store = Some(store);
        inner.swap_router();
    }

    /// Register the routes of one file; duplicates are skipped.
    pub fn add_file(&self, file: &File) {
        let mut inner = self.inner.write();
        inner.register_file(file);
        inner.swap_router();
    }

    /// Remove every route entry targeting `path`, then rebuild.
    ///
    /// Fails when the file had no registered routes.
    pub fn remove_file(&self, path: &str) -> Result<(), RouteError> {
        let clean = site_path::normalize(path);

        let mut inner = self.inner.write();
        let doomed: Vec<String> = inner
            .routes
            .iter()
            .filter(|(_, target)| **target == clean)
            .map(|(pattern, _)| pattern.clone())
            .collect();
        if doomed.is_empty() {
            return Err(RouteError::NoRoutesForFile(clean));
        }
        for pattern in doomed {
            inner.routes.remove(&pattern);
        }
        inner.swap_router();
        Ok(())
    }

    /// Remove every route entry whose target lies under a directory path,
    /// then rebuild. Used when a directory disappears without per-file
    /// events.
    pub fn remove_dir(&self, dir_path: &str) {
        let clean = site_path::normalize(dir_path);

        let mut inner = self.inner.write();
        let before = inner.routes.len();
        inner
            .routes
            .retain(|_, target| !site_path::is_under(target, &clean));
        if inner.routes.len() != before {
            inner.swap_router();
        }
    }

    /// Register a single pattern. Fails on duplicates and invalid patterns.
    pub fn add_route(&self, pattern: &str, path: &str) -> Result<(), RouteError> {
        let normalized = normalize_route(pattern)?;
        let clean = site_path::normalize(path);

        let mut inner = self.inner.write();
        if inner.routes.contains_key(&normalized) {
            return Err(RouteError::AlreadyExists(normalized));
        }
        inner.routes.insert(normalized, clean);
        inner.swap_router();
        Ok(())
    }

    /// Remove a single pattern, then rebuild.
    pub fn remove_route(&self, pattern: &str) -> Result<(), RouteError> {
        let normalized = normalize_route(pattern)?;

        let mut inner = self.inner.write();
        if inner.routes.remove(&normalized).is_none() {
            return Err(RouteError::NotFound(normalized));
        }
        inner.swap_router();
        Ok(())
    }

    /// Rebuild the serving router from the current route set.
    pub fn rebuild(&self) {
        self.inner.write().swap_router();
    }

    /// The current serving router. Callers keep the snapshot for the whole
    /// request; later swaps do not affect it.
    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.inner.read().router)
    }

    /// The store handle bound at initialization.
    pub fn store(&self) -> Option<Arc<FileStore>> {
        self.inner.read().store.clone()
    }

    pub fn route_exists(&self, pattern: &str) -> bool {
        match normalize_route(pattern) {
            Ok(p) => self.inner.read().routes.contains_key(&p),
            Err(_) => false,
        }
    }

    pub fn route_count(&self) -> usize {
        self.inner.read().routes.len()
    }

    /// Snapshot of the route set (pattern → target path).
    pub fn routes(&self) -> FxHashMap<String, String> {
        self.inner.read().routes.clone()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

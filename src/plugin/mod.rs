//! Plugin system: the processing pipeline that turns source files into
//! servable artifacts.
//!
//! Plugins are matched by capability (`can_process`) and run in priority
//! order (lower first). Each plugin receives the in-flight copy of the file
//! plus a read-only graph handle; it returns content, routes, MIME type, and
//! declared dependencies. Failures are isolated: a failing plugin's
//! contributions are dropped and the chain continues.

pub mod frontmatter;
pub mod html;
pub mod layout;
pub mod markdown;
pub mod registry;
pub mod text;

pub use registry::PluginRegistry;

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::content::{File, GraphQuery};

/// Context handed to a plugin for one processing run.
///
/// `file` is a copy: plugins may freely decode metadata into it, but cannot
/// reach the graph through it. Lookups (layout fragments, sibling metadata)
/// go through `graph`.
pub struct PluginContext<'a> {
    pub file: File,
    pub graph: GraphQuery<'a>,
    pub site_dir: &'a Path,
}

/// The outcome of one plugin run.
#[derive(Default)]
pub struct PluginResult {
    pub success: bool,
    pub error: Option<anyhow::Error>,
    /// Whether `new_content` should replace the in-flight content.
    pub modified: bool,
    pub new_content: Option<Vec<u8>>,
    /// Routes this file should answer on. Non-empty lists replace earlier
    /// plugins' routes (last write wins).
    pub routes: Vec<String>,
    /// MIME type; non-empty values replace earlier plugins'.
    pub mime_type: String,
    /// Paths of files this file's content is derived from.
    pub dependencies: Vec<String>,
    /// Additional files produced by the plugin. Reserved; the store ignores
    /// it today.
    pub output_files: FxHashMap<String, Vec<u8>>,
}

impl PluginResult {
    /// A failed run; contributions are discarded by the pipeline.
    pub fn failure(error: anyhow::Error) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Self::default()
        }
    }
}

/// A content-processing plugin.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Execution priority; lower runs earlier.
    fn priority(&self) -> i32;

    /// Pure predicate on path/metadata; must not touch the filesystem.
    fn can_process(&self, file: &File) -> bool;

    fn process(&self, ctx: &mut PluginContext) -> PluginResult;
}

/// Derive the routes for a content file per the route contract:
/// `/<rel>` plus `/<rel>` without its extension, and for `index.*` files
/// additionally the directory URL (the root index exposes `/`).
pub fn derive_routes(file_path: &str) -> Vec<String> {
    let rel = file_path.strip_prefix("content/").unwrap_or(file_path);
    let route = format!("/{rel}");
    let base = crate::content::path::base_name(rel);

    let mut routes = vec![route.clone()];
    if let Some((stem, _ext)) = base.rsplit_once('.') {
        if !stem.is_empty() {
            let prefix = &route[..route.len() - base.len()];
            routes.push(format!("{prefix}{stem}"));
        }
    }

    if base.starts_with("index.") {
        let dir = match route.rsplit_once('/') {
            Some(("", _)) | None => "/".to_string(),
            Some((dir, _)) => dir.to_string(),
        };
        routes.push(dir);
    }
    routes
}

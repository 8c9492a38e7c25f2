//! Plugin registration and the processing chain.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{Plugin, PluginContext, PluginResult};
use crate::content::{File, FileStore, GraphQuery};
use crate::{debug, log};

/// Holds registered plugins sorted by priority (lower runs earlier).
pub struct PluginRegistry {
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
        }
    }

    /// Register a plugin; the list stays sorted on insertion. Registration
    /// order breaks priority ties.
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        let mut plugins = self.plugins.write();
        plugins.push(plugin);
        plugins.sort_by_key(|p| p.priority());
    }

    /// All plugins whose `can_process` accepts the file, in priority order.
    pub fn plugins_for(&self, file: &File) -> Vec<Arc<dyn Plugin>> {
        self.plugins
            .read()
            .iter()
            .filter(|p| p.can_process(file))
            .cloned()
            .collect()
    }

    /// `"<name> (priority: <n>)"` for every registered plugin, in priority
    /// order.
    pub fn list(&self) -> Vec<String> {
        self.plugins
            .read()
            .iter()
            .map(|p| format!("{} (priority: {})", p.name(), p.priority()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Run the chain of matching plugins over a file copy and return the
    /// transformed copy.
    ///
    /// Per step: `modified` + content replace the in-flight bytes,
    /// dependencies accumulate, non-empty routes and MIME type overwrite
    /// earlier values (last write wins). A failing plugin's contributions are
    /// dropped and the next plugin runs against the unchanged copy.
    pub fn process(&self, file: File, store: &FileStore) -> File {
        let matching = self.plugins_for(&file);
        if matching.is_empty() {
            debug!("plugin"; "no plugin matches {}", file.path);
            return file;
        }

        let mut ctx = PluginContext {
            file,
            graph: GraphQuery::new(store),
            site_dir: store.site_dir(),
        };

        for plugin in matching {
            let result = plugin.process(&mut ctx);
            if !result.success {
                match result.error {
                    Some(e) => log!("plugin"; "{} failed on {}: {:#}", plugin.name(), ctx.file.path, e),
                    None => log!("plugin"; "{} failed on {}", plugin.name(), ctx.file.path),
                }
                continue;
            }
            self.apply(&mut ctx.file, result);
        }

        ctx.file
    }

    fn apply(&self, file: &mut File, result: PluginResult) {
        if result.modified {
            if let Some(bytes) = result.new_content {
                file.content = Some(bytes);
            }
        }
        for dep in result.dependencies {
            file.dependencies.insert(dep);
        }
        if !result.mime_type.is_empty() {
            file.metadata.mime_type = result.mime_type;
        }
        if !result.routes.is_empty() {
            file.routes = result.routes;
        }
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

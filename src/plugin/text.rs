//! Built-in plain-text plugin.

use anyhow::anyhow;

use super::{derive_routes, Plugin, PluginContext, PluginResult};
use crate::content::File;
use crate::utils::mime;

/// Serves `.txt` files verbatim as `text/plain`.
pub struct TextPlugin;

impl Plugin for TextPlugin {
    fn name(&self) -> &str {
        "builtin/text"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn can_process(&self, file: &File) -> bool {
        file.name.to_ascii_lowercase().ends_with(".txt")
    }

    fn process(&self, ctx: &mut PluginContext) -> PluginResult {
        let Some(raw) = ctx.file.read_source(ctx.site_dir) else {
            return PluginResult::failure(anyhow!("source unreadable"));
        };

        PluginResult {
            success: true,
            modified: true,
            new_content: Some(raw),
            routes: derive_routes(&ctx.file.path),
            mime_type: mime::types::PLAIN.to_string(),
            ..PluginResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FileStore;
    use std::sync::Arc;

    #[test]
    fn test_text_passthrough() {
        let tmp = tempfile::tempdir().unwrap();
        let abs = tmp.path().join("content/notes.txt");
        std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
        std::fs::write(&abs, "plain words").unwrap();

        let store = FileStore::new(tmp.path());
        store.walk_directory("").unwrap();
        store.plugins().register(Arc::new(TextPlugin));

        let out = store.process_file("content/notes.txt").unwrap();
        assert_eq!(out.content.as_deref(), Some(b"plain words".as_ref()));
        assert_eq!(out.metadata.mime_type, "text/plain; charset=utf-8");
        assert_eq!(out.routes, vec!["/notes.txt", "/notes"]);
    }

    #[test]
    fn test_can_process_only_txt() {
        let p = TextPlugin;
        assert!(p.can_process(&File::new("content/a.txt", "content")));
        assert!(!p.can_process(&File::new("content/a.md", "content")));
    }
}

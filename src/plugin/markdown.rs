//! Built-in Markdown plugin.

use std::collections::BTreeMap;

use anyhow::anyhow;
use pulldown_cmark::{html, Options, Parser};

use super::{derive_routes, frontmatter, layout, Plugin, PluginContext, PluginResult};
use crate::content::File;
use crate::utils::mime;

/// Renders `.md`/`.markdown` content files to HTML, wrapped in the shared
/// layout unless `ignore-layout` is set.
pub struct MarkdownPlugin {
    options: Options,
    vars: layout::LayoutVars,
}

impl MarkdownPlugin {
    /// Build the plugin from its verbatim config map. Recognized keys
    /// (`tables`, `footnotes`, `strikethrough`, `task-lists`) toggle the
    /// matching pulldown-cmark extension; everything defaults to enabled.
    pub fn new(vars: layout::LayoutVars, params: &BTreeMap<String, String>) -> Self {
        let enabled = |key: &str| params.get(key).map(String::as_str) != Some("false");

        let mut options = Options::empty();
        if enabled("tables") {
            options.insert(Options::ENABLE_TABLES);
        }
        if enabled("footnotes") {
            options.insert(Options::ENABLE_FOOTNOTES);
        }
        if enabled("strikethrough") {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if enabled("task-lists") {
            options.insert(Options::ENABLE_TASKLISTS);
        }

        Self { options, vars }
    }

    fn render(&self, text: &str) -> String {
        let parser = Parser::new_ext(text, self.options);
        let mut out = String::new();
        html::push_html(&mut out, parser);
        out
    }
}

impl Plugin for MarkdownPlugin {
    fn name(&self) -> &str {
        "builtin/markdown"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn can_process(&self, file: &File) -> bool {
        if file.path.starts_with("layout/") {
            return false;
        }
        let name = file.name.to_ascii_lowercase();
        name.ends_with(".md") || name.ends_with(".markdown")
    }

    fn process(&self, ctx: &mut PluginContext) -> PluginResult {
        let Some(raw) = ctx.file.read_source(ctx.site_dir) else {
            return PluginResult::failure(anyhow!("source unreadable"));
        };
        let text = String::from_utf8_lossy(&raw).into_owned();

        let (meta, body_text) = frontmatter::strip(&text, &ctx.file.path);
        if let Some(meta) = meta {
            ctx.file.metadata = meta;
        }

        let routes = derive_routes(&ctx.file.path);

        // Redirect-only page: nothing to render, the handler answers 302.
        if !ctx.file.metadata.redirect_url.is_empty() {
            return PluginResult {
                success: true,
                modified: true,
                new_content: Some(Vec::new()),
                routes,
                ..PluginResult::default()
            };
        }

        let rendered = self.render(&body_text);

        let (body, dependencies) = if ctx.file.metadata.ignore_layout {
            (rendered.into_bytes(), Vec::new())
        } else {
            match layout::wrap(ctx, rendered.as_bytes()) {
                Ok(wrapped) => wrapped,
                Err(e) => return PluginResult::failure(e),
            }
        };

        let body = self
            .vars
            .apply(&String::from_utf8_lossy(&body), &ctx.file.metadata)
            .into_bytes();

        PluginResult {
            success: true,
            modified: true,
            new_content: Some(body),
            routes,
            mime_type: mime::types::HTML.to_string(),
            dependencies,
            ..PluginResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FileStore;
    use std::sync::Arc;

    fn site_with(files: &[(&str, &str)]) -> (tempfile::TempDir, FileStore) {
        let tmp = tempfile::tempdir().unwrap();
        for (path, body) in files {
            let abs = tmp.path().join(path);
            std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
            std::fs::write(&abs, body).unwrap();
        }
        let store = FileStore::new(tmp.path());
        store.walk_directory("").unwrap();
        (tmp, store)
    }

    fn plugin() -> MarkdownPlugin {
        MarkdownPlugin::new(layout::LayoutVars::default(), &BTreeMap::new())
    }

    #[test]
    fn test_can_process() {
        let p = plugin();
        assert!(p.can_process(&File::new("content/a.md", "content")));
        assert!(p.can_process(&File::new("content/a.MARKDOWN", "content")));
        assert!(!p.can_process(&File::new("content/a.txt", "content")));
        assert!(!p.can_process(&File::new("layout/a.md", "layout")));
    }

    #[test]
    fn test_renders_heading_with_layout() {
        let (_tmp, store) = site_with(&[
            ("content/index.md", "# Hi"),
            ("layout/header.html", "<header>"),
            ("layout/footer.html", "</footer>"),
        ]);
        store.plugins().register(Arc::new(plugin()));

        let out = store.process_file("content/index.md").unwrap();
        let body = String::from_utf8(out.content.unwrap()).unwrap();
        assert!(body.starts_with("<header>"));
        assert!(body.contains("<h1>Hi</h1>"));
        assert!(body.ends_with("</footer>"));
        assert_eq!(out.metadata.mime_type, "text/html");
        assert_eq!(out.routes, vec!["/index.md", "/index", "/"]);
        assert!(out.dependencies.contains("layout/header.html"));
        assert!(out.dependencies.contains("layout/footer.html"));
    }

    #[test]
    fn test_missing_layout_fails_without_contributions() {
        let (_tmp, store) = site_with(&[("content/a.md", "# Hi")]);
        store.plugins().register(Arc::new(plugin()));

        let out = store.process_file("content/a.md").unwrap();
        assert!(out.content.is_none());
        assert!(out.routes.is_empty());
    }

    #[test]
    fn test_ignore_layout() {
        let (_tmp, store) = site_with(&[(
            "content/bare.md",
            "---\nignore-layout: true\n---\n# Solo",
        )]);
        store.plugins().register(Arc::new(plugin()));

        let out = store.process_file("content/bare.md").unwrap();
        let body = String::from_utf8(out.content.unwrap()).unwrap();
        assert!(body.contains("<h1>Solo</h1>"));
        assert!(!body.contains("header"));
        assert!(out.dependencies.is_empty());
    }

    #[test]
    fn test_redirect_page() {
        let (_tmp, store) = site_with(&[(
            "content/old.md",
            "---\nredirect-url: /new\n---\nignored",
        )]);
        store.plugins().register(Arc::new(plugin()));

        let out = store.process_file("content/old.md").unwrap();
        assert_eq!(out.metadata.redirect_url, "/new");
        assert_eq!(out.content.as_deref(), Some(b"".as_ref()));
        assert_eq!(out.routes, vec!["/old.md", "/old"]);
    }

    #[test]
    fn test_frontmatter_title_substituted() {
        let (_tmp, store) = site_with(&[
            (
                "content/t.md",
                "---\ntitle: Hello\n---\nbody",
            ),
            ("layout/header.html", "<title>__PAGE_TITLE__</title>"),
            ("layout/footer.html", ""),
        ]);
        store.plugins().register(Arc::new(plugin()));

        let out = store.process_file("content/t.md").unwrap();
        let body = String::from_utf8(out.content.unwrap()).unwrap();
        assert!(body.starts_with("<title>Hello</title>"));
        assert_eq!(out.metadata.title, "Hello");
    }
}

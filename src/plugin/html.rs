//! Built-in HTML plugin.

use anyhow::anyhow;

use super::{derive_routes, frontmatter, layout, Plugin, PluginContext, PluginResult};
use crate::content::File;
use crate::utils::mime;

/// Serves `.html`/`.htm` content files as-is (frontmatter stripped), wrapped
/// in the shared layout unless `ignore-layout` is set.
pub struct HtmlPlugin {
    vars: layout::LayoutVars,
}

impl HtmlPlugin {
    pub fn new(vars: layout::LayoutVars) -> Self {
        Self { vars }
    }
}

impl Plugin for HtmlPlugin {
    fn name(&self) -> &str {
        "builtin/html"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn can_process(&self, file: &File) -> bool {
        if file.path.starts_with("layout/") {
            return false;
        }
        let name = file.name.to_ascii_lowercase();
        name.ends_with(".html") || name.ends_with(".htm")
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

        if !ctx.file.metadata.redirect_url.is_empty() {
            return PluginResult {
                success: true,
                modified: true,
                new_content: Some(Vec::new()),
                routes,
                ..PluginResult::default()
            };
        }

        let (body, dependencies) = if ctx.file.metadata.ignore_layout {
            (body_text.into_bytes(), Vec::new())
        } else {
            match layout::wrap(ctx, body_text.as_bytes()) {
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

//! Layout assembly: header/footer wrapping and placeholder substitution.
//!
//! Page plugins wrap their rendered body in `layout/header.html` and
//! `layout/footer.html` and declare both as dependencies, so a layout edit
//! invalidates every page built from it. Placeholders of the form
//! `__SITE_TITLE__` are substituted from site config and page metadata.

use anyhow::{anyhow, Result};

use super::PluginContext;
use crate::config::SiteConfig;
use crate::content::FileMetadata;

/// Path of the shared page header fragment.
pub const HEADER_PATH: &str = "layout/header.html";
/// Path of the shared page footer fragment.
pub const FOOTER_PATH: &str = "layout/footer.html";

/// Site-level template variables, captured from config at plugin
/// registration.
#[derive(Debug, Clone, Default)]
pub struct LayoutVars {
    pub site_title: String,
    pub site_description: String,
    pub favicon: String,
    pub css_file: String,
}

impl LayoutVars {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            site_title: config.server.title.clone(),
            site_description: config.server.description.clone(),
            favicon: config.branding.favicon.clone(),
            css_file: config.branding.css_file.clone(),
        }
    }

    /// Substitute the known placeholders. Page-level values win over
    /// site-level ones where both exist (`__CSS_FILE__`).
    pub fn apply(&self, content: &str, meta: &FileMetadata) -> String {
        let css = if meta.css_file.is_empty() {
            &self.css_file
        } else {
            &meta.css_file
        };
        content
            .replace("__SITE_TITLE__", &self.site_title)
            .replace("__SITE_DESCRIPTION__", &self.site_description)
            .replace("__FAVICON__", &self.favicon)
            .replace("__CSS_FILE__", css)
            .replace("__PAGE_TITLE__", &meta.title)
            .replace("__PAGE_AUTHOR__", &meta.author)
    }
}

/// Wrap a rendered body in the shared header and footer.
///
/// Fragments come from the graph when cached, from disk otherwise (no store
/// lock is held during plugin execution, so the read is safe). Returns the
/// assembled bytes plus the dependency paths to declare; a missing or
/// unreadable fragment fails the plugin run.
pub fn wrap(ctx: &PluginContext, body: &[u8]) -> Result<(Vec<u8>, Vec<String>)> {
    let header = fragment(ctx, HEADER_PATH)?;
    let footer = fragment(ctx, FOOTER_PATH)?;

    let mut assembled = Vec::with_capacity(header.len() + body.len() + footer.len());
    assembled.extend_from_slice(&header);
    assembled.extend_from_slice(body);
    assembled.extend_from_slice(&footer);

    Ok((assembled, vec![HEADER_PATH.into(), FOOTER_PATH.into()]))
}

fn fragment(ctx: &PluginContext, path: &str) -> Result<Vec<u8>> {
    let file = ctx
        .graph
        .get_file(path)
        .ok_or_else(|| anyhow!("layout fragment {path} not in graph"))?;
    match file.content {
        Some(bytes) => Ok(bytes),
        None => file
            .read_source(ctx.site_dir)
            .ok_or_else(|| anyhow!("layout fragment {path} unreadable")),
    }
}

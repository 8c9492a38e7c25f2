//! File records and their metadata bag.

use std::path::Path;

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::log;

/// Metadata attached to a file, populated from frontmatter and plugins.
///
/// Keys use the kebab-case spelling of the frontmatter format
/// (`redirect-url`, `date-of-last-update`, ...). Unknown keys are kept in
/// `extra` so later plugins can read what earlier ones wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FileMetadata {
    pub title: String,
    pub author: String,
    pub css_file: String,
    pub tags: Vec<String>,
    pub mime_type: String,
    pub redirect_url: String,
    pub ignore_layout: bool,
    pub date_of_last_update: Option<NaiveDate>,

    /// Plugin-set keys that have no dedicated field.
    #[serde(flatten)]
    pub extra: std::collections::BTreeMap<String, serde_yaml::Value>,
}

/// One source file in the content graph.
///
/// Dependency relations are path-keyed in both directions; the store keeps
/// the two sides consistent (`g ∈ f.dependencies ⇔ f ∈ g.dependents`).
#[derive(Debug, Clone, Serialize)]
pub struct File {
    /// Basename.
    pub name: String,
    /// Site-relative normalized path.
    pub path: String,
    /// Path of the parent directory (`""` for the root).
    pub parent: String,
    /// URL patterns this file answers on, in registration order.
    pub routes: Vec<String>,
    /// Latest processed bytes. `None` marks the file as needing rebuild.
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
    pub metadata: FileMetadata,
    /// Paths of files this file's content is derived from.
    pub dependencies: FxHashSet<String>,
    /// Paths of files derived from this one.
    pub dependents: FxHashSet<String>,
}

impl File {
    pub fn new(path: &str, parent: &str) -> Self {
        Self {
            name: super::path::base_name(path).to_string(),
            path: path.to_string(),
            parent: parent.to_string(),
            routes: Vec::new(),
            content: None,
            metadata: FileMetadata::default(),
            dependencies: FxHashSet::default(),
            dependents: FxHashSet::default(),
        }
    }

    /// Do plugins need to run on this file?
    pub fn needs_update(&self) -> bool {
        self.content.is_none()
    }

    /// Read the source bytes from disk, or `None` on error.
    pub fn read_source(&self, site_dir: &Path) -> Option<Vec<u8>> {
        let path = site_dir.join(&self.path);
        match std::fs::read(&path) {
            Ok(body) => Some(body),
            Err(e) => {
                log!("store"; "failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// The Content-Type served for this file.
    pub fn mime_or_default(&self) -> &str {
        if self.metadata.mime_type.is_empty() {
            "application/octet-stream"
        } else {
            &self.metadata.mime_type
        }
    }
}

//! Directory nodes of the content graph.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Metadata attached to a directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DirectoryMetadata {
    pub title: String,
    pub css_file: String,
}

/// One directory in the content graph.
///
/// Children are referenced by name; the store resolves them through the
/// global path index, so directory records never dangle after deletions.
#[derive(Debug, Clone, Serialize)]
pub struct Directory {
    /// Basename (`""` for the root).
    pub name: String,
    /// Site-relative normalized path (`""` for the root).
    pub path: String,
    /// Path of the parent directory. `None` for the root.
    pub parent: Option<String>,
    /// Names of child directories.
    pub subdirs: FxHashSet<String>,
    /// Names of child files.
    pub files: FxHashSet<String>,
    pub metadata: DirectoryMetadata,
}

impl Directory {
    pub fn new(path: &str, parent: Option<&str>) -> Self {
        Self {
            name: super::path::base_name(path).to_string(),
            path: path.to_string(),
            parent: parent.map(str::to_string),
            subdirs: FxHashSet::default(),
            files: FxHashSet::default(),
            metadata: DirectoryMetadata::default(),
        }
    }

    /// The root directory: empty name, empty path, no parent.
    pub fn root() -> Self {
        Self::new("", None)
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

//! Normalized filesystem events.

use std::fmt;
use std::time::SystemTime;

/// What happened on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    FileCreated,
    FileModified,
    FileDeleted,
    FileRenamed,
    DirCreated,
    DirDeleted,
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FileCreated => "FileCreated",
            Self::FileModified => "FileModified",
            Self::FileDeleted => "FileDeleted",
            Self::FileRenamed => "FileRenamed",
            Self::DirCreated => "DirCreated",
            Self::DirDeleted => "DirDeleted",
        };
        f.write_str(s)
    }
}

/// One normalized filesystem change, in site-relative terms.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    /// Site-relative normalized path.
    pub path: String,
    /// Previous path, for renames.
    pub old_path: Option<String>,
    pub is_dir: bool,
    pub timestamp: SystemTime,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<String>, is_dir: bool) -> Self {
        Self {
            kind,
            path: path.into(),
            old_path: None,
            is_dir,
            timestamp: SystemTime::now(),
        }
    }

    pub fn renamed(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            kind: WatchEventKind::FileRenamed,
            path: new_path.into(),
            old_path: Some(old_path.into()),
            is_dir: false,
            timestamp: SystemTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(WatchEventKind::FileCreated.to_string(), "FileCreated");
        assert_eq!(WatchEventKind::DirDeleted.to_string(), "DirDeleted");
    }

    #[test]
    fn test_renamed_carries_old_path() {
        let ev = WatchEvent::renamed("content/a.md", "content/b.md");
        assert_eq!(ev.kind, WatchEventKind::FileRenamed);
        assert_eq!(ev.old_path.as_deref(), Some("content/a.md"));
        assert_eq!(ev.path, "content/b.md");
    }
}

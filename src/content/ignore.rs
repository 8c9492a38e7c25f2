//! Ignore rules applied at walk time and to watcher events.
//!
//! A path is ignored when its basename starts with `.`, when it is a
//! symlink, or when it carries an editor/temp suffix.

use std::fs::Metadata;
use std::path::Path;

/// Suffixes of editor backup and lock files.
const TEMP_SUFFIXES: [&str; 5] = [".bak", ".tmp", "~", ".swp", ".lock"];

/// Whether a basename alone marks the entry as ignored.
pub fn is_ignored_name(name: &str) -> bool {
    if name.starts_with('.') {
        return true;
    }
    TEMP_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Whether an entry is ignored, given its (symlink-aware) metadata.
pub fn is_ignored(path: &Path, meta: &Metadata) -> bool {
    if meta.file_type().is_symlink() {
        return true;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    is_ignored_name(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_names() {
        assert!(is_ignored_name(".git"));
        assert!(is_ignored_name(".DS_Store"));
        assert!(!is_ignored_name("index.md"));
    }

    #[test]
    fn test_temp_suffixes() {
        assert!(is_ignored_name("page.md.bak"));
        assert!(is_ignored_name("page.md.tmp"));
        assert!(is_ignored_name("page.md~"));
        assert!(is_ignored_name("page.md.swp"));
        assert!(is_ignored_name("site.lock"));
        assert!(!is_ignored_name("page.md"));
        assert!(!is_ignored_name("locker.txt"));
    }

    #[test]
    fn test_symlink_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real.txt");
        std::fs::write(&target, "data").unwrap();
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let meta = std::fs::symlink_metadata(&link).unwrap();
        assert!(is_ignored(&link, &meta));

        let meta = std::fs::symlink_metadata(&target).unwrap();
        assert!(!is_ignored(&target, &meta));
    }
}

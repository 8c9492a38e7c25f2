//! Site-relative path normalization.
//!
//! Every key in the content graph is a site-relative POSIX path: forward
//! slashes, no `.` or `..` segments, no leading or trailing slash. The root
//! directory is the empty string.

use std::path::{Component, Path};

/// Normalize a site-relative path.
///
/// Collapses `.` segments, resolves `..` against preceding segments (a `..`
/// at the top is dropped, so a path can never escape the site root), and
/// strips redundant slashes. The root normalizes to `""`.
///
/// # Examples
/// ```ignore
/// assert_eq!(normalize("content//posts/./a.md"), "content/posts/a.md");
/// assert_eq!(normalize("content/posts/../a.md"), "content/a.md");
/// assert_eq!(normalize("."), "");
/// ```
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// The basename of a normalized path (`""` for the root).
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The parent of a normalized path.
///
/// Returns `""` for top-level entries and `None` for the root itself.
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(""))
}

/// Join a normalized parent path with a child name.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Whether `path` equals `root` or lies below it (segment-boundary aware,
/// so `contents/a` is not under `content`).
pub fn is_under(path: &str, root: &str) -> bool {
    if root.is_empty() {
        return true;
    }
    path == root || path.strip_prefix(root).is_some_and(|r| r.starts_with('/'))
}

/// Convert an absolute filesystem path into a normalized site-relative path.
///
/// Returns `None` when `abs` is not below `site_dir`.
pub fn relative_to(site_dir: &Path, abs: &Path) -> Option<String> {
    let rel = abs.strip_prefix(site_dir).ok()?;
    let mut out = String::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                if !out.is_empty() {
                    out.push('/');
                }
                out.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("content/posts/a.md"), "content/posts/a.md");
        assert_eq!(normalize("content//posts/./a.md"), "content/posts/a.md");
        assert_eq!(normalize("content/posts/../a.md"), "content/a.md");
        assert_eq!(normalize("/content/"), "content");
        assert_eq!(normalize("."), "");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("../../etc/passwd"), "etc/passwd");
    }

    #[test]
    fn test_normalize_idempotent() {
        for p in ["content/./a/../b.md", "a//b", "", ".", "x/y/z"] {
            let once = normalize(p);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_base_name_and_parent() {
        assert_eq!(base_name("content/posts/a.md"), "a.md");
        assert_eq!(base_name("a.md"), "a.md");
        assert_eq!(parent("content/posts/a.md"), Some("content/posts"));
        assert_eq!(parent("a.md"), Some(""));
        assert_eq!(parent(""), None);
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "content"), "content");
        assert_eq!(join("content", "a.md"), "content/a.md");
    }

    #[test]
    fn test_is_under_segment_boundaries() {
        assert!(is_under("content/a.md", "content"));
        assert!(is_under("content", "content"));
        assert!(!is_under("contents/a.md", "content"));
        assert!(is_under("anything", ""));
    }

    #[test]
    fn test_relative_to() {
        let site = PathBuf::from("/srv/site");
        assert_eq!(
            relative_to(&site, &site.join("content/a.md")),
            Some("content/a.md".to_string())
        );
        assert_eq!(relative_to(&site, &site), Some(String::new()));
        assert_eq!(relative_to(&site, &PathBuf::from("/etc/passwd")), None);
    }
}

//! YAML frontmatter extraction.
//!
//! Frontmatter sits at the start of the file, delimited by `---` lines:
//!
//! ```text
//! ---
//! title: My page
//! redirect-url: /new
//! ---
//! body starts here
//! ```

use crate::content::FileMetadata;
use crate::debug;

/// Delimiter for frontmatter sections.
const DELIMITER: &str = "---";

/// Split a document into its raw YAML prologue and the body.
///
/// Returns `None` when the document carries no frontmatter (including the
/// unclosed case, where the whole document is treated as body).
pub fn extract(content: &str) -> Option<(String, String)> {
    let mut lines = content.lines();
    if lines.next()?.trim() != DELIMITER {
        return None;
    }

    let mut yaml_lines: Vec<&str> = Vec::new();
    loop {
        match lines.next() {
            Some(line) if line.trim() == DELIMITER => {
                let body: Vec<&str> = lines.collect();
                return Some((yaml_lines.join("\n"), body.join("\n")));
            }
            Some(line) => yaml_lines.push(line),
            None => return None,
        }
    }
}

/// Decode frontmatter into the metadata bag and return the remaining body.
///
/// Malformed YAML leaves the document untouched: the caller gets `None`
/// metadata and the full original content as body.
pub fn strip(content: &str, origin: &str) -> (Option<FileMetadata>, String) {
    let Some((yaml, body)) = extract(content) else {
        return (None, content.to_string());
    };
    if yaml.trim().is_empty() {
        return (Some(FileMetadata::default()), body);
    }
    match serde_yaml::from_str::<FileMetadata>(&yaml) {
        Ok(meta) => (Some(meta), body),
        Err(e) => {
            debug!("plugin"; "invalid frontmatter in {origin}: {e}");
            (None, content.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_basic() {
        let doc = "---\ntitle: Hi\n---\n# Body";
        let (yaml, body) = extract(doc).unwrap();
        assert_eq!(yaml, "title: Hi");
        assert_eq!(body, "# Body");
    }

    #[test]
    fn test_extract_none_without_delimiter() {
        assert!(extract("# Just a body").is_none());
        assert!(extract("").is_none());
    }

    #[test]
    fn test_extract_unclosed() {
        assert!(extract("---\ntitle: Hi\n# never closed").is_none());
    }

    #[test]
    fn test_strip_decodes_metadata() {
        let doc = "---\ntitle: Hello\nredirect-url: /new\n---\nbody";
        let (meta, body) = strip(doc, "content/a.md");
        let meta = meta.unwrap();
        assert_eq!(meta.title, "Hello");
        assert_eq!(meta.redirect_url, "/new");
        assert_eq!(body, "body");
    }

    #[test]
    fn test_strip_bad_yaml_keeps_document() {
        let doc = "---\n: : :\n---\nbody";
        let (meta, body) = strip(doc, "content/a.md");
        assert!(meta.is_none());
        assert_eq!(body, doc);
    }

    #[test]
    fn test_strip_empty_frontmatter() {
        let doc = "---\n---\nbody";
        let (meta, body) = strip(doc, "content/a.md");
        assert!(meta.is_some());
        assert_eq!(body, "body");
    }
}

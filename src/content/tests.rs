use std::sync::Arc;

use tempfile::TempDir;

use super::*;
use crate::plugin::{Plugin, PluginContext, PluginResult};

/// Site fixture: files written to disk, store walked over everything.
fn walked(files: &[(&str, &str)]) -> (TempDir, FileStore) {
    let tmp = TempDir::new().unwrap();
    for (path, body) in files {
        let abs = tmp.path().join(path);
        std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
        std::fs::write(&abs, body).unwrap();
    }
    let store = FileStore::new(tmp.path());
    store.walk_directory("").unwrap();
    (tmp, store)
}

/// Plugin that copies the source bytes and declares fixed dependencies.
struct PassthroughPlugin {
    dependencies: Vec<String>,
}

impl Plugin for PassthroughPlugin {
    fn name(&self) -> &str {
        "test/passthrough"
    }
    fn priority(&self) -> i32 {
        100
    }
    fn can_process(&self, file: &crate::content::File) -> bool {
        file.name.ends_with(".md")
    }
    fn process(&self, ctx: &mut PluginContext) -> PluginResult {
        let Some(raw) = ctx.file.read_source(ctx.site_dir) else {
            return PluginResult::failure(anyhow::anyhow!("unreadable"));
        };
        PluginResult {
            success: true,
            modified: true,
            new_content: Some(raw),
            dependencies: self.dependencies.clone(),
            ..PluginResult::default()
        }
    }
}

// ----------------------------------------------------------------------------
// walk
// ----------------------------------------------------------------------------

#[test]
fn test_walk_populates_tree_and_index() {
    let (_tmp, store) = walked(&[
        ("content/index.md", "# Hi"),
        ("content/posts/a.md", "# A"),
        ("layout/header.html", "<h>"),
    ]);

    assert!(store.get_file("content/index.md").is_some());
    assert!(store.get_file("content/posts/a.md").is_some());
    assert!(store.get_file("layout/header.html").is_some());

    let root = store.get_directory("").unwrap();
    assert!(root.subdirs.contains("content"));
    assert!(root.subdirs.contains("layout"));

    let posts = store.get_directory("content/posts").unwrap();
    assert_eq!(posts.parent.as_deref(), Some("content"));
    assert!(posts.files.contains("a.md"));
}

#[test]
fn test_walk_skips_ignored_entries() {
    let (_tmp, store) = walked(&[
        ("content/ok.md", "x"),
        ("content/.hidden.md", "x"),
        ("content/backup.md.bak", "x"),
        ("content/.git/objects/aa", "x"),
        ("content/editor.md.swp", "x"),
    ]);

    assert!(store.get_file("content/ok.md").is_some());
    assert!(store.get_file("content/.hidden.md").is_none());
    assert!(store.get_file("content/backup.md.bak").is_none());
    assert!(store.get_file("content/.git/objects/aa").is_none());
    assert!(store.get_file("content/editor.md.swp").is_none());
    assert!(store.get_directory("content/.git").is_none());
}

#[test]
fn test_walk_missing_root_fails() {
    let tmp = TempDir::new().unwrap();
    let store = FileStore::new(tmp.path());
    assert!(store.walk_directory("does-not-exist").is_err());
}

#[test]
fn test_walk_is_idempotent_over_existing_records() {
    let (_tmp, store) = walked(&[("content/a.md", "x")]);
    store
        .plugins()
        .register(Arc::new(PassthroughPlugin {
            dependencies: vec![],
        }));
    store.process_all_files();
    assert!(store.get_file("content/a.md").unwrap().content.is_some());

    // Re-walking must not reset processed state.
    store.walk_directory("content").unwrap();
    assert!(store.get_file("content/a.md").unwrap().content.is_some());
}

// ----------------------------------------------------------------------------
// add/remove file
// ----------------------------------------------------------------------------

#[test]
fn test_add_file_marks_for_update() {
    let (_tmp, store) = walked(&[("content/a.md", "x")]);
    store
        .plugins()
        .register(Arc::new(PassthroughPlugin {
            dependencies: vec![],
        }));
    store.process_all_files();
    assert!(!store.get_file("content/a.md").unwrap().needs_update());

    let re_seated = store.add_file("content/a.md");
    assert!(re_seated.needs_update());
    assert!(store.get_file("content/a.md").unwrap().needs_update());
}

#[test]
#[should_panic(expected = "parent directory")]
fn test_add_file_missing_parent_panics() {
    let tmp = TempDir::new().unwrap();
    let store = FileStore::new(tmp.path());
    store.add_file("never/walked/file.md");
}

#[test]
fn test_add_then_remove_restores_graph() {
    let (_tmp, store) = walked(&[("content/a.md", "x")]);
    let before = store.get_all_files().len();

    store.add_file("content/fresh.md");
    assert!(store.get_file("content/fresh.md").is_some());

    store.remove_file("content/fresh.md");
    assert!(store.get_file("content/fresh.md").is_none());
    assert_eq!(store.get_all_files().len(), before);
    let content_dir = store.get_directory("content").unwrap();
    assert!(!content_dir.files.contains("fresh.md"));
}

#[test]
fn test_remove_file_is_noop_when_absent() {
    let (_tmp, store) = walked(&[]);
    store.remove_file("content/ghost.md");
}

// ----------------------------------------------------------------------------
// dependencies
// ----------------------------------------------------------------------------

#[test]
fn test_dependency_edges_are_inverse_consistent() {
    let (_tmp, store) = walked(&[("content/a.md", "x"), ("layout/h.html", "y")]);
    store.add_dependency("content/a.md", "layout/h.html");

    let a = store.get_file("content/a.md").unwrap();
    let h = store.get_file("layout/h.html").unwrap();
    assert!(a.dependencies.contains("layout/h.html"));
    assert!(h.dependents.contains("content/a.md"));
    assert!(a.dependents.is_empty());
    assert!(h.dependencies.is_empty());
}

#[test]
fn test_mark_for_update_clears_transitive_dependents() {
    let (_tmp, store) = walked(&[
        ("layout/h.html", "h"),
        ("content/a.md", "a"),
        ("content/b.md", "b"),
    ]);
    // b depends on a, a depends on h
    store.add_dependency("content/a.md", "layout/h.html");
    store.add_dependency("content/b.md", "content/a.md");

    // Give everything fake content so the marking is observable.
    store
        .plugins()
        .register(Arc::new(PassthroughPlugin {
            dependencies: vec![],
        }));
    store.process_all_files();

    store.mark_for_update("layout/h.html");
    assert!(store.get_file("content/a.md").unwrap().needs_update());
    assert!(store.get_file("content/b.md").unwrap().needs_update());
}

#[test]
fn test_mark_for_update_terminates_on_cycle() {
    let (_tmp, store) = walked(&[("content/a.md", "a"), ("content/b.md", "b")]);
    store.add_dependency("content/a.md", "content/b.md");
    store.add_dependency("content/b.md", "content/a.md");

    store.mark_for_update("content/a.md");
    assert!(store.get_file("content/a.md").unwrap().needs_update());
    assert!(store.get_file("content/b.md").unwrap().needs_update());
}

#[test]
fn test_remove_file_severs_edges_and_marks_dependents() {
    let (_tmp, store) = walked(&[
        ("layout/h.html", "h"),
        ("content/a.md", "a"),
    ]);
    store.add_dependency("content/a.md", "layout/h.html");
    store
        .plugins()
        .register(Arc::new(PassthroughPlugin {
            dependencies: vec![],
        }));
    store.process_all_files();
    assert!(!store.get_file("content/a.md").unwrap().needs_update());

    store.remove_file("layout/h.html");

    assert!(store.get_file("layout/h.html").is_none());
    let a = store.get_file("content/a.md").unwrap();
    assert!(a.needs_update());
    assert!(!a.dependencies.contains("layout/h.html"));
    // No remaining edge anywhere mentions the removed path.
    for file in store.get_all_files().values() {
        assert!(!file.dependencies.contains("layout/h.html"));
        assert!(!file.dependents.contains("layout/h.html"));
    }
}

// ----------------------------------------------------------------------------
// remove directory
// ----------------------------------------------------------------------------

#[test]
fn test_remove_directory_deletes_subtree() {
    let (_tmp, store) = walked(&[
        ("content/blog/a.md", "a"),
        ("content/blog/drafts/b.md", "b"),
        ("content/about.md", "c"),
    ]);

    store.remove_directory("content/blog");

    assert!(store.get_file("content/blog/a.md").is_none());
    assert!(store.get_file("content/blog/drafts/b.md").is_none());
    assert!(store.get_directory("content/blog").is_none());
    assert!(store.get_directory("content/blog/drafts").is_none());
    assert!(store.get_file("content/about.md").is_some());

    let content_dir = store.get_directory("content").unwrap();
    assert!(!content_dir.subdirs.contains("blog"));
}

#[test]
fn test_remove_directory_respects_segment_boundaries() {
    let (_tmp, store) = walked(&[
        ("content/a.md", "a"),
        ("contents/b.md", "b"),
    ]);

    store.remove_directory("content");
    assert!(store.get_file("content/a.md").is_none());
    assert!(store.get_file("contents/b.md").is_some());
}

#[test]
fn test_remove_directory_marks_surviving_dependents() {
    let (_tmp, store) = walked(&[
        ("layout/h.html", "h"),
        ("content/a.md", "a"),
    ]);
    store.add_dependency("content/a.md", "layout/h.html");
    store
        .plugins()
        .register(Arc::new(PassthroughPlugin {
            dependencies: vec![],
        }));
    store.process_all_files();

    store.remove_directory("layout");

    let a = store.get_file("content/a.md").unwrap();
    assert!(a.needs_update());
    assert!(!a.dependencies.contains("layout/h.html"));
}

// ----------------------------------------------------------------------------
// processing
// ----------------------------------------------------------------------------

#[test]
fn test_process_all_fills_content() {
    let (_tmp, store) = walked(&[("content/a.md", "alpha"), ("content/b.md", "beta")]);
    store
        .plugins()
        .register(Arc::new(PassthroughPlugin {
            dependencies: vec![],
        }));

    store.process_all_files();
    assert_eq!(
        store.get_file("content/a.md").unwrap().content.as_deref(),
        Some(b"alpha".as_ref())
    );
    assert_eq!(
        store.get_file("content/b.md").unwrap().content.as_deref(),
        Some(b"beta".as_ref())
    );
}

#[test]
fn test_process_updated_only_rebuilds_marked_files() {
    let (tmp, store) = walked(&[("content/a.md", "a1"), ("content/b.md", "b1")]);
    store
        .plugins()
        .register(Arc::new(PassthroughPlugin {
            dependencies: vec![],
        }));
    store.process_all_files();

    // Change both sources, but only mark one.
    std::fs::write(tmp.path().join("content/a.md"), "a2").unwrap();
    std::fs::write(tmp.path().join("content/b.md"), "b2").unwrap();
    store.mark_for_update("content/a.md");

    let rebuilt = store.process_updated_files();
    assert_eq!(rebuilt.len(), 1);
    assert_eq!(rebuilt[0].path, "content/a.md");
    assert_eq!(
        store.get_file("content/a.md").unwrap().content.as_deref(),
        Some(b"a2".as_ref())
    );
    assert_eq!(
        store.get_file("content/b.md").unwrap().content.as_deref(),
        Some(b"b1".as_ref())
    );
}

#[test]
fn test_processing_registers_inverse_dependents() {
    let (_tmp, store) = walked(&[("content/a.md", "a"), ("layout/h.html", "h")]);
    store.plugins().register(Arc::new(PassthroughPlugin {
        dependencies: vec!["layout/h.html".into()],
    }));

    store.process_all_files();

    let a = store.get_file("content/a.md").unwrap();
    let h = store.get_file("layout/h.html").unwrap();
    assert!(a.dependencies.contains("layout/h.html"));
    assert!(h.dependents.contains("content/a.md"));
}

#[test]
fn test_dependency_on_removed_file_is_dropped_at_writeback() {
    let (_tmp, store) = walked(&[("content/a.md", "a")]);
    store.plugins().register(Arc::new(PassthroughPlugin {
        dependencies: vec!["layout/gone.html".into()],
    }));

    store.process_all_files();

    let a = store.get_file("content/a.md").unwrap();
    assert!(!a.dependencies.contains("layout/gone.html"));
}

#[test]
fn test_get_all_files_is_a_snapshot() {
    let (_tmp, store) = walked(&[("content/a.md", "a")]);
    let mut snapshot = store.get_all_files();
    snapshot.clear();
    assert!(store.get_file("content/a.md").is_some());
}

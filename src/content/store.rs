//! The file store: tree, path index, dependency edges, and pipeline driver.
//!
//! One RW lock guards the tree, the index, and all graph edges. Pipeline
//! execution never runs under that lock; the only permitted discipline is
//! snapshot → process the clones → write back per key. This keeps mutations
//! brief, admits parallel rebuilds, and gives readers at most one observed
//! state per path.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{dir::Directory, file::File, ignore, path};
use crate::plugin::PluginRegistry;
use crate::{debug, log};

/// Dependency-aware store of every non-ignored file and directory below the
/// site root.
pub struct FileStore {
    site_dir: PathBuf,
    plugins: PluginRegistry,
    inner: RwLock<StoreInner>,
}

struct StoreInner {
    /// Directories keyed by path. The root (`""`) is always present.
    dirs: FxHashMap<String, Directory>,
    /// Global file index keyed by path.
    files: FxHashMap<String, File>,
}

impl FileStore {
    pub fn new(site_dir: impl Into<PathBuf>) -> Self {
        let mut dirs = FxHashMap::default();
        dirs.insert(String::new(), Directory::root());

        Self {
            site_dir: site_dir.into(),
            plugins: PluginRegistry::new(),
            inner: RwLock::new(StoreInner {
                dirs,
                files: FxHashMap::default(),
            }),
        }
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Recursively walk a directory below the site root and make every
    /// non-ignored file and directory present in the graph.
    ///
    /// The walk is idempotent: existing records (and their edges and cached
    /// content) are left untouched, newly discovered files start out marked
    /// for rebuild. Per-entry errors are logged and skipped; only an
    /// inaccessible root fails the call.
    pub fn walk_directory(&self, rel: &str) -> Result<()> {
        let rel_root = path::normalize(rel);
        let abs_root = if rel_root.is_empty() {
            self.site_dir.clone()
        } else {
            self.site_dir.join(&rel_root)
        };
        let root_meta = std::fs::metadata(&abs_root)
            .with_context(|| format!("cannot access {}", abs_root.display()))?;

        let mut found_dirs: Vec<String> = Vec::new();
        let mut found_files: Vec<String> = Vec::new();

        let walker = jwalk::WalkDir::new(&abs_root)
            .skip_hidden(false)
            .process_read_dir(|_depth, _path, _state, children| {
                children.retain(|entry| {
                    entry.as_ref().map_or(true, |e| {
                        let name = e.file_name().to_string_lossy();
                        !ignore::is_ignored_name(&name) && !e.file_type().is_symlink()
                    })
                });
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log!("store"; "walk error below {}: {}", rel_root, e);
                    continue;
                }
            };
            let Some(rel_path) = path::relative_to(&self.site_dir, &entry.path()) else {
                continue;
            };
            if entry.file_type().is_dir() {
                found_dirs.push(rel_path);
            } else if entry.file_type().is_file() {
                found_files.push(rel_path);
            }
        }

        let mut inner = self.inner.write();
        if root_meta.is_dir() {
            inner.ensure_dir(&rel_root);
        }
        for dir in &found_dirs {
            inner.ensure_dir(dir);
        }
        for file in &found_files {
            inner.insert_file_if_absent(file);
        }
        Ok(())
    }

    /// Look up a file by path. Returns a clone; the graph is not exposed.
    pub fn get_file(&self, p: &str) -> Option<File> {
        let clean = path::normalize(p);
        self.inner.read().files.get(&clean).cloned()
    }

    /// Look up a directory by path (`""` for the root).
    pub fn get_directory(&self, p: &str) -> Option<Directory> {
        let clean = path::normalize(p);
        self.inner.read().dirs.get(&clean).cloned()
    }

    /// Snapshot of the whole file index. The caller may mutate the returned
    /// map freely; the contained records are clones.
    pub fn get_all_files(&self) -> FxHashMap<String, File> {
        self.inner.read().files.clone()
    }

    /// Add a file to the graph, or re-seat an existing one, and mark it (and
    /// transitively everything derived from it) for rebuild.
    ///
    /// # Panics
    ///
    /// Panics when the parent directory is not present in the graph. Walk the
    /// parent first; calling this without it is a programmer error.
    pub fn add_file(&self, p: &str) -> File {
        let clean = path::normalize(p);
        let parent = path::parent(&clean).unwrap_or("").to_string();

        let mut inner = self.inner.write();
        if !inner.dirs.contains_key(&parent) {
            panic!("parent directory {parent:?} does not exist for file {clean:?}");
        }
        if !inner.files.contains_key(&clean) {
            inner.insert_file_if_absent(&clean);
        }
        inner.mark_for_update(&clean);
        inner
            .files
            .get(&clean)
            .cloned()
            .expect("file is present after insertion")
    }

    /// Remove a file and every edge touching it; former dependents are marked
    /// for rebuild. No-op when the path is absent.
    pub fn remove_file(&self, p: &str) {
        let clean = path::normalize(p);

        let mut inner = self.inner.write();
        let Some(file) = inner.files.remove(&clean) else {
            return;
        };
        if let Some(dir) = inner.dirs.get_mut(&file.parent) {
            dir.files.remove(&file.name);
        }
        for dependent in &file.dependents {
            inner.mark_for_update(dependent);
        }
        for other in inner.files.values_mut() {
            other.dependencies.remove(&clean);
            other.dependents.remove(&clean);
        }
    }

    /// Remove a directory subtree: every file and directory below it, and
    /// every edge touching a removed file. Surviving dependents of removed
    /// files are marked for rebuild. No-op when nothing lies under the path.
    pub fn remove_directory(&self, p: &str) {
        let clean = path::normalize(p);
        if clean.is_empty() {
            return;
        }

        let mut inner = self.inner.write();
        let doomed_files: FxHashSet<String> = inner
            .files
            .keys()
            .filter(|k| path::is_under(k, &clean))
            .cloned()
            .collect();
        let doomed_dirs: Vec<String> = inner
            .dirs
            .keys()
            .filter(|k| !k.is_empty() && path::is_under(k, &clean))
            .cloned()
            .collect();
        if doomed_files.is_empty() && doomed_dirs.is_empty() {
            return;
        }

        let mut to_mark: Vec<String> = Vec::new();
        for doomed in &doomed_files {
            if let Some(file) = inner.files.get(doomed) {
                to_mark.extend(
                    file.dependents
                        .iter()
                        .filter(|d| !doomed_files.contains(*d))
                        .cloned(),
                );
            }
        }

        for doomed in &doomed_files {
            if let Some(file) = inner.files.remove(doomed) {
                if let Some(dir) = inner.dirs.get_mut(&file.parent) {
                    dir.files.remove(&file.name);
                }
            }
        }
        for doomed in &doomed_dirs {
            if let Some(dir) = inner.dirs.remove(doomed) {
                if let Some(parent) = dir.parent.as_ref().and_then(|p| inner.dirs.get_mut(p)) {
                    parent.subdirs.remove(&dir.name);
                }
            }
        }
        for other in inner.files.values_mut() {
            other.dependencies.retain(|d| !doomed_files.contains(d));
            other.dependents.retain(|d| !doomed_files.contains(d));
        }
        for survivor in to_mark {
            inner.mark_for_update(&survivor);
        }
    }

    /// Establish the edge `from → to` and its inverse.
    ///
    /// Silently skipped when either endpoint is absent from the graph.
    pub fn add_dependency(&self, from: &str, to: &str) {
        let from = path::normalize(from);
        let to = path::normalize(to);

        let mut inner = self.inner.write();
        if !inner.files.contains_key(&from) || !inner.files.contains_key(&to) {
            debug!("store"; "dependency {from} -> {to} skipped: endpoint missing");
            return;
        }
        if let Some(f) = inner.files.get_mut(&from) {
            f.dependencies.insert(to.clone());
        }
        if let Some(t) = inner.files.get_mut(&to) {
            t.dependents.insert(from);
        }
    }

    /// Clear the cached content of a file and, transitively, of everything
    /// derived from it. Safe on dependency cycles.
    pub fn mark_for_update(&self, p: &str) {
        let clean = path::normalize(p);
        self.inner.write().mark_for_update(&clean);
    }

    /// Run the pipeline over every file in the graph.
    ///
    /// Per-file failures are recorded by the registry and do not stop the
    /// batch.
    pub fn process_all_files(&self) {
        let snapshot: Vec<File> = self.inner.read().files.values().cloned().collect();
        self.process_batch(snapshot);
    }

    /// Run the pipeline over every file whose content is absent. Returns the
    /// stored results.
    pub fn process_updated_files(&self) -> Vec<File> {
        let snapshot: Vec<File> = self
            .inner
            .read()
            .files
            .values()
            .filter(|f| f.needs_update())
            .cloned()
            .collect();
        self.process_batch(snapshot)
    }

    /// Run the pipeline over a single file and return the stored result.
    pub fn process_file(&self, p: &str) -> Option<File> {
        let clean = path::normalize(p);
        let file = self.inner.read().files.get(&clean).cloned()?;
        self.process_batch(vec![file]).into_iter().next()
    }

    /// Snapshot → process outside the lock → write back per key.
    fn process_batch(&self, snapshot: Vec<File>) -> Vec<File> {
        let processed: Vec<File> = snapshot
            .into_par_iter()
            .map(|file| self.plugins.process(file, self))
            .collect();

        let mut stored = Vec::with_capacity(processed.len());
        for file in processed {
            if let Some(f) = self.store_result(file) {
                stored.push(f);
            }
        }
        stored
    }

    /// Store one pipeline result under the write lock.
    ///
    /// The inverse (dependents) side is owned by the store: the copy's
    /// snapshot of it is discarded in favor of the current index, then the
    /// copy's dependency list is folded in. A result for a path removed
    /// mid-flight is dropped rather than resurrected.
    fn store_result(&self, mut file: File) -> Option<File> {
        let mut inner = self.inner.write();
        let Some(current) = inner.files.get(&file.path) else {
            debug!("store"; "dropping result for removed file {}", file.path);
            return None;
        };
        file.dependents = current.dependents.clone();
        file.dependencies
            .retain(|dep| inner.files.contains_key(dep));
        for dep in file.dependencies.clone() {
            if let Some(target) = inner.files.get_mut(&dep) {
                target.dependents.insert(file.path.clone());
            }
        }
        inner.files.insert(file.path.clone(), file.clone());
        Some(file)
    }
}

impl StoreInner {
    /// Create a directory record and all missing ancestors.
    fn ensure_dir(&mut self, dir_path: &str) {
        if self.dirs.contains_key(dir_path) {
            return;
        }
        let mut current = String::new();
        for segment in dir_path.split('/').filter(|s| !s.is_empty()) {
            let next = path::join(&current, segment);
            if !self.dirs.contains_key(&next) {
                let node = Directory::new(&next, Some(&current));
                if let Some(parent) = self.dirs.get_mut(&current) {
                    parent.subdirs.insert(node.name.clone());
                }
                self.dirs.insert(next.clone(), node);
            }
            current = next;
        }
    }

    /// Insert a fresh file record unless one is already present.
    fn insert_file_if_absent(&mut self, file_path: &str) {
        if self.files.contains_key(file_path) {
            return;
        }
        let parent = path::parent(file_path).unwrap_or("").to_string();
        self.ensure_dir(&parent);
        let file = File::new(file_path, &parent);
        if let Some(dir) = self.dirs.get_mut(&parent) {
            dir.files.insert(file.name.clone());
        }
        self.files.insert(file_path.to_string(), file);
    }

    /// Iterative worklist over dependent edges with a visited set; each
    /// reachable file has its content cleared exactly once, cycles included.
    fn mark_for_update(&mut self, start: &str) {
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut worklist = vec![start.to_string()];
        while let Some(p) = worklist.pop() {
            if !visited.insert(p.clone()) {
                continue;
            }
            if let Some(file) = self.files.get_mut(&p) {
                file.content = None;
                worklist.extend(file.dependents.iter().cloned());
            }
        }
    }
}

/// Read-only view of the store handed to plugins.
///
/// Plugins look up layout fragments and sibling metadata through this handle;
/// graph mutation stays out of reach.
#[derive(Clone, Copy)]
pub struct GraphQuery<'a> {
    store: &'a FileStore,
}

impl<'a> GraphQuery<'a> {
    pub fn new(store: &'a FileStore) -> Self {
        Self { store }
    }

    pub fn get_file(&self, p: &str) -> Option<File> {
        self.store.get_file(p)
    }

    pub fn get_directory(&self, p: &str) -> Option<Directory> {
        self.store.get_directory(p)
    }

    pub fn site_dir(&self) -> &'a Path {
        self.store.site_dir()
    }
}

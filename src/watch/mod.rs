//! Filesystem watcher: native events in, normalized events out.
//!
//! The watcher attaches a non-recursive OS watch to every non-ignored
//! directory below the root and keeps that set under its own lock, so a
//! REMOVE on a watched path can be classified as a directory deletion
//! without a stat. A dispatch thread translates native events and pushes
//! them onto a bounded channel; sends never block, and on a full channel the
//! event is dropped with a log record (the path resyncs on its next edit).
//!
//! Lifecycle is `Unstarted → Running → Stopped`, no transitions back.

pub mod event;
pub mod listener;


use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::content::{ignore, path as site_path};
use crate::{debug, log};
pub use event::{WatchEvent, WatchEventKind};
pub use listener::{EventListener, ListenerCtx};

/// Capacity of the normalized event channel.
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Typed watcher/listener failures.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watcher is already running")]
    AlreadyRunning,
    #[error("watcher is not running")]
    NotRunning,
    #[error("watcher was stopped and cannot be restarted")]
    Terminal,
    #[error("watch root {0} is not a directory")]
    NotADirectory(String),
    #[error(transparent)]
    Notify(#[from] notify::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatcherState {
    Unstarted,
    Running,
    Stopped,
}

/// State shared with the dispatch thread: everything event translation
/// needs, nothing lifecycle owns.
struct WatchShared {
    root: RwLock<PathBuf>,
    watched_dirs: RwLock<FxHashSet<PathBuf>>,
    dropped: AtomicU64,
}

/// Watches a site root and emits [`WatchEvent`]s on a bounded channel.
pub struct FsWatcher {
    state: Mutex<WatcherState>,
    shared: Arc<WatchShared>,
    backend: Mutex<Option<RecommendedWatcher>>,
    event_tx: Mutex<Option<Sender<WatchEvent>>>,
    event_rx: Receiver<WatchEvent>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

impl FsWatcher {
    pub fn new() -> Self {
        let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(WatcherState::Unstarted),
            shared: Arc::new(WatchShared {
                root: RwLock::new(PathBuf::new()),
                watched_dirs: RwLock::new(FxHashSet::default()),
                dropped: AtomicU64::new(0),
            }),
            backend: Mutex::new(None),
            event_tx: Mutex::new(Some(tx)),
            event_rx: rx,
            dispatch: Mutex::new(None),
        }
    }

    /// Start watching a root directory.
    ///
    /// Refuses a second call: the lifecycle is one-shot. The native watcher
    /// is created, every non-ignored directory below the root is attached,
    /// and the dispatch thread starts translating events.
    pub fn start(&self, root: &Path) -> Result<(), WatchError> {
        let meta = std::fs::metadata(root)?;
        if !meta.is_dir() {
            return Err(WatchError::NotADirectory(root.display().to_string()));
        }

        {
            let mut state = self.state.lock();
            match *state {
                WatcherState::Unstarted => *state = WatcherState::Running,
                WatcherState::Running => return Err(WatchError::AlreadyRunning),
                WatcherState::Stopped => return Err(WatchError::Terminal),
            }
        }

        *self.shared.root.write() = root.to_path_buf();

        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let watcher = match notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| {
                let _ = notify_tx.send(res);
            },
        ) {
            Ok(w) => w,
            Err(e) => {
                *self.state.lock() = WatcherState::Unstarted;
                return Err(e.into());
            }
        };
        *self.backend.lock() = Some(watcher);

        self.add_directory_watch(root)?;

        let tx = self
            .event_tx
            .lock()
            .take()
            .expect("event sender available on first start");
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => shared.dispatch_event(&tx, event),
                    Err(e) => log!("watch"; "notify error: {}", e),
                }
            }
            // Sender drops here, closing the event channel.
        });
        *self.dispatch.lock() = Some(handle);

        log!("watch"; "watching {}", root.display());
        Ok(())
    }

    /// Stop the watcher: close the native handle, wait for the dispatch
    /// thread, which closes the event channel. Terminal; errors when not
    /// running.
    pub fn stop(&self) -> Result<(), WatchError> {
        {
            let mut state = self.state.lock();
            if *state != WatcherState::Running {
                return Err(WatchError::NotRunning);
            }
            *state = WatcherState::Stopped;
        }

        // Dropping the native watcher drops its callback sender, which ends
        // the dispatch loop.
        *self.backend.lock() = None;
        if let Some(handle) = self.dispatch.lock().take() {
            let _ = handle.join();
        }
        self.shared.watched_dirs.write().clear();

        log!("watch"; "stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock() == WatcherState::Running
    }

    /// Receiver for the normalized event stream. The channel closes after
    /// `stop`.
    pub fn subscribe(&self) -> Receiver<WatchEvent> {
        self.event_rx.clone()
    }

    /// Number of events dropped because the channel was full.
    pub fn dropped_events(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Currently watched directories (absolute paths).
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        self.shared.watched_dirs.read().iter().cloned().collect()
    }

    /// Attach a watch to a directory and every non-ignored directory below
    /// it. Per-directory failures are logged and skipped.
    pub fn add_directory_watch(&self, dir: &Path) -> Result<(), WatchError> {
        let mut backend = self.backend.lock();
        let Some(watcher) = backend.as_mut() else {
            return Err(WatchError::NotRunning);
        };

        let walker = jwalk::WalkDir::new(dir)
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
                    log!("watch"; "walk error below {}: {}", dir.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            if let Err(e) = watcher.watch(&path, RecursiveMode::NonRecursive) {
                log!("watch"; "failed to watch {}: {}", path.display(), e);
                continue;
            }
            self.shared.watched_dirs.write().insert(path.clone());
            debug!("watch"; "watching directory {}", path.display());
        }
        Ok(())
    }

    /// Detach the watch from a directory and everything below it.
    pub fn remove_directory_watch(&self, dir: &Path) {
        let mut backend = self.backend.lock();
        let mut dirs = self.shared.watched_dirs.write();
        dirs.retain(|watched| {
            if watched.starts_with(dir) {
                if let Some(watcher) = backend.as_mut() {
                    if let Err(e) = watcher.unwatch(watched) {
                        debug!("watch"; "unwatch {} failed: {}", watched.display(), e);
                    }
                }
                debug!("watch"; "stopped watching {}", watched.display());
                false
            } else {
                true
            }
        });
    }
}

impl Default for FsWatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------
// Event translation (dispatch thread)
// ----------------------------------------------------------------------

impl WatchShared {
    fn dispatch_event(&self, tx: &Sender<WatchEvent>, event: notify::Event) {
        use notify::event::{ModifyKind, RenameMode};
        use notify::EventKind;

        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                for p in &event.paths {
                    self.emit_removed(tx, p);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                for p in &event.paths {
                    self.emit_created(tx, p);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                self.emit_renamed(tx, &event.paths[0], &event.paths[1]);
            }
            EventKind::Modify(ModifyKind::Name(_)) => {
                for p in &event.paths {
                    self.emit_stat_based(tx, p);
                }
            }
            EventKind::Modify(_) => {
                for p in &event.paths {
                    self.emit_modified(tx, p);
                }
            }
            EventKind::Create(_) => {
                for p in &event.paths {
                    self.emit_created(tx, p);
                }
            }
            EventKind::Remove(_) => {
                for p in &event.paths {
                    self.emit_removed(tx, p);
                }
            }
            _ => {}
        }
    }

    /// WRITE on a regular, non-ignored, extant file.
    fn emit_modified(&self, tx: &Sender<WatchEvent>, abs: &Path) {
        let Ok(meta) = std::fs::symlink_metadata(abs) else {
            // Deleted between event and stat; the REMOVE event follows.
            return;
        };
        if meta.is_dir() || ignore::is_ignored(abs, &meta) {
            return;
        }
        let Some(rel) = self.relative(abs) else { return };
        self.send(tx, WatchEvent::new(WatchEventKind::FileModified, rel, false));
    }

    /// CREATE: stat decides directory vs file.
    fn emit_created(&self, tx: &Sender<WatchEvent>, abs: &Path) {
        let meta = match std::fs::symlink_metadata(abs) {
            Ok(m) => m,
            Err(e) => {
                debug!("watch"; "failed to stat created {}: {}", abs.display(), e);
                return;
            }
        };
        if ignore::is_ignored(abs, &meta) {
            return;
        }
        let Some(rel) = self.relative(abs) else { return };
        let kind = if meta.is_dir() {
            WatchEventKind::DirCreated
        } else {
            WatchEventKind::FileCreated
        };
        self.send(tx, WatchEvent::new(kind, rel, meta.is_dir()));
    }

    /// REMOVE: a path we were watching was a directory, anything else a file.
    fn emit_removed(&self, tx: &Sender<WatchEvent>, abs: &Path) {
        let was_dir = self.watched_dirs.read().contains(abs);
        let Some(rel) = self.relative(abs) else { return };
        let kind = if was_dir {
            WatchEventKind::DirDeleted
        } else {
            WatchEventKind::FileDeleted
        };
        self.send(tx, WatchEvent::new(kind, rel, was_dir));
    }

    /// Rename with both endpoints known.
    fn emit_renamed(&self, tx: &Sender<WatchEvent>, old_abs: &Path, new_abs: &Path) {
        let old_was_dir = self.watched_dirs.read().contains(old_abs);
        let new_meta = std::fs::symlink_metadata(new_abs).ok();

        match new_meta {
            None => self.emit_removed(tx, old_abs),
            Some(meta) if old_was_dir || meta.is_dir() => {
                self.emit_removed(tx, old_abs);
                self.emit_created(tx, new_abs);
            }
            Some(meta) if ignore::is_ignored(new_abs, &meta) => {
                // Renamed into an ignored name: effectively a deletion.
                self.emit_removed(tx, old_abs);
            }
            Some(_) => {
                let (Some(old_rel), Some(new_rel)) =
                    (self.relative(old_abs), self.relative(new_abs))
                else {
                    return;
                };
                self.send(tx, WatchEvent::renamed(old_rel, new_rel));
            }
        }
    }

    /// Platform gave a rename without direction: decide by existence.
    fn emit_stat_based(&self, tx: &Sender<WatchEvent>, abs: &Path) {
        if abs.exists() {
            self.emit_created(tx, abs);
        } else {
            self.emit_removed(tx, abs);
        }
    }

    /// Non-blocking send with drop-on-full.
    fn send(&self, tx: &Sender<WatchEvent>, event: WatchEvent) {
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log!("watch"; "event channel full, dropping event for {}", event.path);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn relative(&self, abs: &Path) -> Option<String> {
        let root = self.root.read();
        site_path::relative_to(&root, abs).filter(|rel| !rel.is_empty())
    }
}

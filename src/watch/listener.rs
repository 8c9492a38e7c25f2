//! Event listener: the single consumer that applies watcher events to the
//! store and the route table.
//!
//! Handler failures are logged and never terminate the consumer loop; a bad
//! file becomes a 404 or stale cached content until it is fixed.

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{bail, Result};
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use super::{FsWatcher, WatchError, WatchEvent, WatchEventKind};
use crate::content::{is_content_path, path as site_path, FileStore};
use crate::logger;
use crate::routes::RouteTable;
use crate::{debug, log};

/// Everything a handler needs: the graph, the route table, and the watcher
/// (for attaching/detaching directory watches).
pub struct ListenerCtx {
    pub store: Arc<FileStore>,
    pub routes: Arc<RouteTable>,
    pub watcher: Arc<FsWatcher>,
}

impl ListenerCtx {
    /// Apply one event to the graph and route table.
    pub fn handle_event(&self, event: &WatchEvent) -> Result<()> {
        debug!("listen"; "{} {}", event.kind, event.path);
        match event.kind {
            WatchEventKind::FileCreated => self.on_file_created(&event.path),
            WatchEventKind::FileModified => self.on_file_modified(&event.path),
            WatchEventKind::FileDeleted => self.on_file_deleted(&event.path),
            WatchEventKind::FileRenamed => self.on_file_renamed(event),
            WatchEventKind::DirCreated => self.on_dir_created(&event.path),
            WatchEventKind::DirDeleted => self.on_dir_deleted(&event.path),
        }
    }

    /// Make sure the file's parent directory chain is present in the graph,
    /// walking it from disk when it is not.
    fn ensure_parent(&self, path: &str) -> Result<()> {
        if let Some(parent) = site_path::parent(path) {
            if !parent.is_empty() && self.store.get_directory(parent).is_none() {
                self.store.walk_directory(parent)?;
            }
        }
        Ok(())
    }

    fn on_file_created(&self, path: &str) -> Result<()> {
        let abs = self.store.site_dir().join(path);
        if std::fs::symlink_metadata(&abs).is_err() {
            bail!("creation event for non-existent file: {path}");
        }

        self.ensure_parent(path)?;
        self.store.add_file(path);

        if let Some(processed) = self.store.process_file(path) {
            if is_content_path(&processed.path) {
                self.routes.add_file(&processed);
            }
        }
        logger::status_success(&format!("created: {path}"));
        Ok(())
    }

    fn on_file_modified(&self, path: &str) -> Result<()> {
        self.ensure_parent(path)?;
        self.store.add_file(path);
        self.store.process_updated_files();
        logger::status_success(&format!("rebuilt: {path}"));
        Ok(())
    }

    fn on_file_deleted(&self, path: &str) -> Result<()> {
        self.store.remove_file(path);
        if is_content_path(path) {
            if let Err(e) = self.routes.remove_file(path) {
                // The file may never have had routes; not fatal.
                log!("listen"; "warning: {e}");
            }
        }
        self.store.process_updated_files();
        logger::status_success(&format!("removed: {path}"));
        Ok(())
    }

    fn on_file_renamed(&self, event: &WatchEvent) -> Result<()> {
        if let Some(old) = &event.old_path {
            if let Err(e) = self.on_file_deleted(old) {
                log!("listen"; "rename: delete phase failed for {old}: {e:#}");
            }
        }
        self.on_file_created(&event.path)
    }

    fn on_dir_created(&self, path: &str) -> Result<()> {
        let abs = self.store.site_dir().join(path);
        self.watcher.add_directory_watch(&abs)?;
        self.store.walk_directory(path)?;

        let processed = self.store.process_updated_files();
        if site_path::is_under(path, "content") {
            for file in &processed {
                if is_content_path(&file.path) && !file.routes.is_empty() {
                    self.routes.add_file(file);
                }
            }
            self.routes.rebuild();
        }
        Ok(())
    }

    fn on_dir_deleted(&self, path: &str) -> Result<()> {
        let abs = self.store.site_dir().join(path);
        self.watcher.remove_directory_watch(&abs);
        self.store.remove_directory(path);
        self.store.process_updated_files();

        if site_path::is_under(path, "content") {
            self.routes.remove_dir(path);
        }
        Ok(())
    }
}

/// Single-consumer thread draining the watcher's event channel.
pub struct EventListener {
    running: Mutex<bool>,
    stop_tx: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventListener {
    /// Spawn the consumer over the watcher's event stream.
    pub fn start(ctx: ListenerCtx) -> Self {
        let events = ctx.watcher.subscribe();
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = std::thread::spawn(move || consume(ctx, events, stop_rx));

        Self {
            running: Mutex::new(true),
            stop_tx: Mutex::new(Some(stop_tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stop the consumer, draining any event in flight. Errors when already
    /// stopped.
    pub fn stop(&self) -> Result<(), WatchError> {
        {
            let mut running = self.running.lock();
            if !*running {
                return Err(WatchError::NotRunning);
            }
            *running = false;
        }
        if let Some(tx) = self.stop_tx.lock().take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }
}

fn consume(ctx: ListenerCtx, events: Receiver<WatchEvent>, stop_rx: Receiver<()>) {
    log!("listen"; "listening for filesystem events");
    loop {
        crossbeam::select! {
            recv(events) -> msg => match msg {
                Ok(event) => {
                    if let Err(e) = ctx.handle_event(&event) {
                        log!("listen"; "error handling {} {}: {:#}", event.kind, event.path, e);
                    }
                }
                Err(_) => {
                    debug!("listen"; "event channel closed");
                    break;
                }
            },
            recv(stop_rx) -> _ => break,
        }
    }
    log!("listen"; "stopped");
}

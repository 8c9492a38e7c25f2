//! HTTP surface: accept loop, request dispatch, graceful shutdown.
//!
//! Requests are handled on a small thread pool so a slow artifact never
//! blocks the accept loop. Each handler captures the router snapshot and the
//! store handle once, then serves from them for the whole request.

pub mod assets;
pub mod response;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tiny_http::{Request, Server};

use crate::config::SiteConfig;
use crate::content::FileStore;
use crate::routes::{normalize_route, RouteTable, ASSETS_PREFIX};
use crate::state;
use crate::watch::{EventListener, FsWatcher, ListenerCtx};
use crate::{debug, log};

/// Threads handling requests concurrently.
const REQUEST_POOL_SIZE: usize = 4;

/// Run the content server: start the watcher and listener, bind HTTP, serve
/// until shutdown, then unwind in order (accept loop, listener, watcher).
pub fn run(config: &SiteConfig, store: Arc<FileStore>, routes: Arc<RouteTable>) -> Result<()> {
    let watcher = Arc::new(FsWatcher::new());
    watcher.start(store.site_dir())?;

    let listener = EventListener::start(ListenerCtx {
        store: Arc::clone(&store),
        routes: Arc::clone(&routes),
        watcher: Arc::clone(&watcher),
    });

    let addr = format!("{}:{}", config.server.hostname, config.server.port);
    let server = Server::http(&addr).map_err(|e| anyhow!("failed to bind {addr}: {e}"))?;
    let server = Arc::new(server);
    state::register_server(Arc::clone(&server));

    log!("serve"; "http://{}", addr);
    run_request_loop(&server, &routes);

    log!("serve"; "shutting down...");
    if let Err(e) = listener.stop() {
        debug!("serve"; "listener stop: {e}");
    }
    if let Err(e) = watcher.stop() {
        debug!("serve"; "watcher stop: {e}");
    }
    Ok(())
}

/// Drain incoming requests onto the worker pool until the server is
/// unblocked by the shutdown handler.
fn run_request_loop(server: &Arc<Server>, routes: &Arc<RouteTable>) {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_POOL_SIZE)
        .build()
        .expect("failed to create request thread pool");

    for request in server.incoming_requests() {
        let routes = Arc::clone(routes);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &routes) {
                log!("serve"; "request error: {e:#}");
            }
        });
    }
}

/// Dispatch one request against the current router snapshot.
fn handle_request(request: Request, routes: &RouteTable) -> Result<()> {
    if state::is_shutdown() {
        return response::respond_unavailable(request);
    }

    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or(&url);
    let router = routes.router();

    if let Some(rel) = path.strip_prefix(ASSETS_PREFIX) {
        return assets::respond_asset(request, router.assets_dir(), rel);
    }

    let Ok(pattern) = normalize_route(path) else {
        return response::respond_not_found(request);
    };
    let Some(file_path) = router.lookup(&pattern) else {
        return response::respond_not_found(request);
    };

    // Capture the store handle once per request.
    let Some(store) = routes.store() else {
        return response::respond_server_error(request);
    };
    response::respond_artifact(request, &store, file_path)
}

//! Plugin surface: activation handshake and the two lifecycle calls.
//!
//! The host owns the reporter. `StartMetrics` starts it at most once per
//! process (one-shot latch); `StopMetrics` stops it when running.

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::json;
use tokio::net::UnixListener;
use tokio::sync::{Mutex, OnceCell};

use crate::reporter::{Lifecycle, Reporter};

/// Content type of plugin API responses.
pub const PLUGIN_CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1+json";

pub struct PluginHost {
    reporter: Mutex<Reporter>,
    started: OnceCell<()>,
}

impl PluginHost {
    pub fn new(reporter: Reporter) -> Self {
        Self {
            reporter: Mutex::new(reporter),
            started: OnceCell::new(),
        }
    }

    /// Start the reporter unless it was started before. Returns true on the call that started it.
    pub async fn start_metrics(&self) -> bool {
        let mut first = false;
        let first_ref = &mut first;
        self.started
            .get_or_init(|| async move {
                self.reporter.lock().await.start();
                *first_ref = true;
            })
            .await;
        if !first {
            tracing::debug!("StartMetrics after first start; ignored");
        }
        first
    }

    /// Stop the reporter if it is running.
    pub async fn stop_metrics(&self) {
        let mut reporter = self.reporter.lock().await;
        if reporter.lifecycle() == Lifecycle::Running {
            reporter.stop().await;
        } else {
            tracing::debug!(state = ?reporter.lifecycle(), "StopMetrics while not running; ignored");
        }
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        self.reporter.lock().await.lifecycle()
    }
}

pub fn build_router(host: Arc<PluginHost>) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/MetricsCollector.StartMetrics", post(start_metrics))
        .route("/MetricsCollector.StopMetrics", post(stop_metrics))
        .with_state(host)
}

fn plugin_json(body: serde_json::Value) -> Response {
    ([(CONTENT_TYPE, PLUGIN_CONTENT_TYPE)], body.to_string()).into_response()
}

async fn activate() -> Response {
    tracing::info!("plugin activated");
    plugin_json(json!({ "Implements": ["MetricsCollector"] }))
}

async fn start_metrics(State(host): State<Arc<PluginHost>>) -> Response {
    host.start_metrics().await;
    plugin_json(json!({ "Err": "" }))
}

async fn stop_metrics(State(host): State<Arc<PluginHost>>) -> Response {
    host.stop_metrics().await;
    plugin_json(json!({}))
}

/// Bind the plugin socket, replacing a stale socket file.
pub fn bind_socket(path: impl AsRef<Path>) -> io::Result<UnixListener> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed stale plugin socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    UnixListener::bind(path)
}

/// Serve the plugin API until `shutdown` resolves.
pub async fn serve(
    listener: UnixListener,
    host: Arc<PluginHost>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    axum::serve(listener, build_router(host))
        .with_graceful_shutdown(shutdown)
        .await
}

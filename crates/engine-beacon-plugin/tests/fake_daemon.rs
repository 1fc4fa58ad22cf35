//! Fake metrics endpoint on a Unix socket (axum), shared by integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

pub const TEXT_CT: &str = "text/plain; version=0.0.4; charset=utf-8";
pub const DELIMITED_CT: &str =
    "application/vnd.google.protobuf; proto=io.prometheus.client.MetricFamily; encoding=delimited";

#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with the whole body at once.
    Body { content_type: String, body: Vec<u8> },
    /// 200 with a streamed body; `gap` sleeps between chunks.
    Chunked {
        content_type: String,
        chunks: Vec<Vec<u8>>,
        gap: Duration,
    },
    /// Any status, empty body.
    Status(u16),
    /// Never answers.
    Hang,
}

impl Reply {
    pub fn text(body: &str) -> Self {
        Reply::Body {
            content_type: TEXT_CT.into(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn delimited(body: Vec<u8>) -> Self {
        Reply::Body {
            content_type: DELIMITED_CT.into(),
            body,
        }
    }
}

#[derive(Clone)]
struct Shared {
    reply: Arc<Mutex<Reply>>,
    hits: Arc<AtomicUsize>,
    accept: Arc<Mutex<Option<String>>>,
}

pub struct FakeDaemon {
    _dir: TempDir,
    path: PathBuf,
    shared: Shared,
    task: JoinHandle<()>,
}

impl FakeDaemon {
    pub async fn start(reply: Reply) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let shared = Shared {
            reply: Arc::new(Mutex::new(reply)),
            hits: Arc::new(AtomicUsize::new(0)),
            accept: Arc::new(Mutex::new(None)),
        };
        let app = Router::new()
            .route("/metrics", get(metrics))
            .with_state(shared.clone());

        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            _dir: dir,
            path,
            shared,
            task,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hits(&self) -> usize {
        self.shared.hits.load(Ordering::SeqCst)
    }

    pub fn last_accept(&self) -> Option<String> {
        self.shared.accept.lock().unwrap().clone()
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.shared.reply.lock().unwrap() = reply;
    }

    /// Poll until at least `n` requests arrived.
    pub async fn wait_for_hits(&self, n: usize, within: Duration) {
        let deadline = tokio::time::Instant::now() + within;
        while self.hits() < n {
            if tokio::time::Instant::now() > deadline {
                panic!("expected {n} requests, saw {}", self.hits());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn metrics(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    shared.hits.fetch_add(1, Ordering::SeqCst);
    *shared.accept.lock().unwrap() = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let reply = shared.reply.lock().unwrap().clone();
    match reply {
        Reply::Body { content_type, body } => {
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Reply::Chunked {
            content_type,
            chunks,
            gap,
        } => {
            let stream = futures_util::stream::iter(chunks.into_iter().enumerate()).then(move |(i, c)| async move {
                if i > 0 {
                    tokio::time::sleep(gap).await;
                }
                Ok::<_, std::io::Error>(Bytes::from(c))
            });
            ([(header::CONTENT_TYPE, content_type)], Body::from_stream(stream)).into_response()
        }
        Reply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        Reply::Hang => std::future::pending::<Response>().await,
    }
}

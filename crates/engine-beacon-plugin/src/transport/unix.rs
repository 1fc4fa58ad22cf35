//! Metrics endpoint client.
//!
//! Deadlines:
//! - dial: `dial_timeout` from the start of the fetch
//! - response header: `response_header_timeout` from when the request is sent
//! - overall: `request_timeout` from the start of the fetch, body reads included
//!
//! Each is capped by the overall deadline. Cancellation wins over a deadline
//! that expires at the same time.

use std::future::Future;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, ACCEPT, CONTENT_TYPE, HOST};
use hyper::{Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use engine_beacon_core::protocol::ACCEPT_HEADER;

use crate::config::TransportSection;
use crate::error::{Phase, TransportError};

const METRICS_PATH: &str = "/metrics";

/// Aborts the connection driver when the fetch or its response goes away.
#[derive(Debug)]
struct ConnGuard(JoinHandle<()>);

impl Drop for ConnGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one step of a fetch against cancellation and a deadline.
async fn step<F: Future>(
    cancel: &CancellationToken,
    deadline: Instant,
    phase: Phase,
    fut: F,
) -> Result<F::Output, TransportError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        r = tokio::time::timeout_at(deadline, fut) => r.map_err(|_| TransportError::Timeout { phase }),
    }
}

#[derive(Debug, Clone)]
pub struct UnixSocketClient {
    sockpath: PathBuf,
    settings: TransportSection,
}

impl UnixSocketClient {
    pub fn new(sockpath: impl Into<PathBuf>, settings: TransportSection) -> Self {
        Self {
            sockpath: sockpath.into(),
            settings,
        }
    }

    pub fn sockpath(&self) -> &Path {
        &self.sockpath
    }

    pub fn settings(&self) -> &TransportSection {
        &self.settings
    }

    /// Issue `GET /metrics` and return once a 200 response header arrived.
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<MetricsResponse, TransportError> {
        let started = Instant::now();
        let deadline = started + self.settings.request_timeout();

        let dial_deadline = deadline.min(started + self.settings.dial_timeout());
        let stream = step(cancel, dial_deadline, Phase::Dial, UnixStream::connect(&self.sockpath))
            .await?
            .map_err(|source| TransportError::Connect {
                path: self.sockpath.display().to_string(),
                source,
            })?;

        let (mut sender, conn) = step(
            cancel,
            dial_deadline,
            Phase::Dial,
            hyper::client::conn::http1::handshake::<_, Empty<Bytes>>(TokioIo::new(stream)),
        )
        .await?
        .map_err(TransportError::Handshake)?;

        let guard = ConnGuard(tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "metrics connection ended with error");
            }
        }));

        let header_deadline = deadline.min(Instant::now() + self.settings.response_header_timeout());
        let resp = step(cancel, header_deadline, Phase::ResponseHeader, sender.send_request(metrics_request()))
            .await?
            .map_err(TransportError::Request)?;

        let status = resp.status();
        if status != StatusCode::OK {
            // body is never read; dropping the guard closes the connection
            return Err(TransportError::BadStatus(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        tracing::debug!(
            sockpath = %self.sockpath.display(),
            content_type = %content_type,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "metrics response header received"
        );

        Ok(MetricsResponse {
            content_type,
            body: resp.into_body(),
            deadline,
            limit: self.settings.max_body_bytes,
            received: 0,
            _conn: guard,
        })
    }
}

fn metrics_request() -> Request<Empty<Bytes>> {
    let mut req = Request::new(Empty::new());
    *req.uri_mut() = Uri::from_static(METRICS_PATH);
    req.headers_mut().insert(HOST, HeaderValue::from_static("localhost"));
    req.headers_mut().insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
    req
}

/// A 200 response whose body is still on the wire.
#[derive(Debug)]
pub struct MetricsResponse {
    content_type: String,
    body: Incoming,
    deadline: Instant,
    limit: usize,
    received: usize,
    _conn: ConnGuard,
}

impl MetricsResponse {
    /// `Content-Type` header value, empty when absent.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Next body chunk, `None` at end of body.
    pub async fn next_chunk(&mut self, cancel: &CancellationToken) -> Result<Option<Bytes>, TransportError> {
        loop {
            let Some(frame) = step(cancel, self.deadline, Phase::Request, self.body.frame()).await? else {
                return Ok(None);
            };
            let frame = frame.map_err(TransportError::Request)?;
            // trailers carry no metrics
            let Ok(data) = frame.into_data() else {
                continue;
            };

            self.received += data.len();
            if self.received > self.limit {
                return Err(TransportError::BodyTooLarge { limit: self.limit });
            }
            return Ok(Some(data));
        }
    }

    /// Read the remaining body into one buffer.
    pub async fn collect(mut self, cancel: &CancellationToken) -> Result<Bytes, TransportError> {
        let mut out = bytes::BytesMut::new();
        while let Some(chunk) = self.next_chunk(cancel).await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}

//! Error types for the reporter service.
//!
//! Each stage has its own enum; [`ErrorKind`] gives a stable string for logs.

use std::fmt;

use engine_beacon_core::DecodeError;
use thiserror::Error;

/// Stable error category (structured log field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Decode,
    Forward,
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Decode => "decode",
            ErrorKind::Forward => "forward",
            ErrorKind::Config => "config",
        }
    }
}

/// Fetch step whose deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Dial,
    ResponseHeader,
    Request,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Dial => "dial",
            Phase::ResponseHeader => "response_header",
            Phase::Request => "request",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure while talking to the metrics socket.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("http handshake failed: {0}")]
    Handshake(#[source] hyper::Error),
    #[error("http request failed: {0}")]
    Request(#[source] hyper::Error),
    #[error("{phase} timeout")]
    Timeout { phase: Phase },
    #[error("unexpected status code {0}")]
    BadStatus(u16),
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
    #[error("cancelled")]
    Cancelled,
}

/// Failure of one gather cycle.
#[derive(Debug, Error)]
pub enum GatherError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
}

impl GatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatherError::Transport(_) => ErrorKind::Transport,
            GatherError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// True when the cycle ended because its token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatherError::Transport(TransportError::Cancelled))
    }
}

/// Failure to deliver an identify event.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("analytics request failed: {0}")]
    Request(String),
    #[error("analytics endpoint rejected event with status {status}")]
    Rejected { status: u16 },
    #[error("encode analytics payload: {0}")]
    Encode(String),
}

impl ForwardError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Forward
    }
}

/// Configuration load or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config failed: {0}")]
    Read(String),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("unsupported config version {0}")]
    UnsupportedVersion(u32),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}

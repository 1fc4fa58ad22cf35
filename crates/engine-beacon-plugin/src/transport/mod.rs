//! Transport layer (HTTP/1.1 over a Unix socket).
//!
//! One fetch is one connection: dial, `GET /metrics`, stream the body, drop.
//! Every await point races the caller's cancellation token and a deadline.

pub mod unix;

pub use unix::{MetricsResponse, UnixSocketClient};

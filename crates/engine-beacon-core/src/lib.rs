//! engine-beacon core: metric family model and exposition format codecs.
//!
//! This crate turns the body of a `/metrics` response into an ordered list of
//! [`MetricFamily`] records. It understands both exposition formats a metrics
//! endpoint may answer with:
//! - length-delimited protobuf `io.prometheus.client.MetricFamily` records,
//! - the line-oriented text format (`# HELP`, `# TYPE`, samples).
//!
//! It carries no transport or runtime dependencies; bodies are fed in as byte
//! chunks so callers can decode while the response is still streaming.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed input is
//! reported as [`DecodeError`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;
pub mod protocol;

pub use error::{DecodeCode, DecodeError, Result};
pub use model::{Label, LabelMap, Metric, MetricFamily, MetricType, Value};
pub use protocol::{decode, encode_delimited, render_text, FamilyDecoder, Format, MediaType};

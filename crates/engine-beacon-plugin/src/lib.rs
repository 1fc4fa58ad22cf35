//! engine-beacon plugin library entry.
//!
//! Wires the Unix socket transport, the gather orchestrator, the reporting
//! loop and the analytics sinks, plus the plugin HTTP surface that drives the
//! reporter's lifecycle. Used by the binary (`main.rs`) and integration tests.

pub mod config;
pub mod error;
pub mod gather;
pub mod plugin;
pub mod reporter;
pub mod sink;
pub mod transport;

pub use error::{ConfigError, ErrorKind, ForwardError, GatherError, Phase, TransportError};
pub use gather::{MetricsSource, UnixSocketSource};
pub use plugin::PluginHost;
pub use reporter::{identify_events, Lifecycle, Reporter};
pub use sink::{AnalyticsSink, Identify};

//! Top-level facade crate for engine-beacon.
//!
//! Re-exports the codec crate and the reporter/plugin library so users can
//! depend on a single crate.

pub mod core {
    pub use engine_beacon_core::*;
}

pub mod plugin {
    pub use engine_beacon_plugin::*;
}

pub use engine_beacon_core::{decode, MetricFamily};
pub use engine_beacon_plugin::{identify_events, Identify, PluginHost, Reporter};

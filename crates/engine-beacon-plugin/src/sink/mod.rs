//! Analytics sinks: where identify events go.

pub mod log;
pub mod segment;

use std::sync::Arc;

use async_trait::async_trait;
use engine_beacon_core::LabelMap;

use crate::config::AnalyticsSection;
use crate::error::{ConfigError, ForwardError};

pub use log::LogSink;
pub use segment::SegmentSink;

/// Associates an entity id with descriptive traits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identify {
    pub user_id: String,
    pub traits: LabelMap,
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn identify(&self, event: Identify) -> Result<(), ForwardError>;
}

/// Segment sink when a write key is configured, log-only otherwise.
pub fn from_config(cfg: &AnalyticsSection) -> Result<Arc<dyn AnalyticsSink>, ConfigError> {
    if cfg.write_key.is_empty() {
        tracing::warn!("analytics.write_key is empty; identify events are only logged");
        return Ok(Arc::new(LogSink));
    }
    Ok(Arc::new(SegmentSink::new(cfg)?))
}

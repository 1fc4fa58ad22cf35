use async_trait::async_trait;

use super::{AnalyticsSink, Identify};
use crate::error::ForwardError;

/// Logs each event and reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AnalyticsSink for LogSink {
    async fn identify(&self, event: Identify) -> Result<(), ForwardError> {
        tracing::info!(user_id = %event.user_id, traits = ?event.traits, "identify (log sink)");
        Ok(())
    }
}

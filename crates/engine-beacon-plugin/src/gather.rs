//! Gather orchestrator: fetch then decode, one cycle at a time.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use engine_beacon_core::protocol::FamilyDecoder;
use engine_beacon_core::MetricFamily;

use crate::error::GatherError;
use crate::transport::UnixSocketClient;

/// Something that yields the current metric families.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn gather(&self, cancel: &CancellationToken) -> Result<Vec<MetricFamily>, GatherError>;
}

/// Gathers from a metrics endpoint on a Unix socket.
#[derive(Debug, Clone)]
pub struct UnixSocketSource {
    client: UnixSocketClient,
}

impl UnixSocketSource {
    pub fn new(client: UnixSocketClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &UnixSocketClient {
        &self.client
    }
}

#[async_trait]
impl MetricsSource for UnixSocketSource {
    async fn gather(&self, cancel: &CancellationToken) -> Result<Vec<MetricFamily>, GatherError> {
        // cycle-scoped token, cancelled on every exit path
        let cycle = cancel.child_token();
        let _cycle_guard = cycle.clone().drop_guard();

        let mut resp = self.client.fetch(&cycle).await?;
        let mut decoder =
            FamilyDecoder::with_record_limit(resp.content_type(), self.client.settings().max_body_bytes)?;

        let mut bytes = 0usize;
        while let Some(chunk) = resp.next_chunk(&cycle).await? {
            bytes += chunk.len();
            decoder.feed(&chunk)?;
        }
        let format = decoder.format();
        let families = decoder.finish()?;

        tracing::debug!(
            format = format.as_str(),
            bytes,
            families = families.len(),
            "gathered metrics"
        );
        Ok(families)
    }
}

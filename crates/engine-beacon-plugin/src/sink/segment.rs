//! Segment tracking API sink (`POST /v1/identify`).
//!
//! Auth is HTTP basic with the write key as user and an empty password.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use engine_beacon_core::LabelMap;

use super::{AnalyticsSink, Identify};
use crate::config::AnalyticsSection;
use crate::error::{ConfigError, ForwardError};

const LIBRARY_NAME: &str = "engine-beacon";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentifyPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    user_id: &'a str,
    traits: &'a LabelMap,
    message_id: String,
    timestamp: String,
    context: PayloadContext,
}

#[derive(Debug, Serialize)]
struct PayloadContext {
    library: Library,
}

#[derive(Debug, Serialize)]
struct Library {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Clone)]
pub struct SegmentSink {
    client: reqwest::Client,
    url: String,
    write_key: String,
}

impl SegmentSink {
    pub fn new(cfg: &AnalyticsSection) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .user_agent(concat!("engine-beacon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("analytics http client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/v1/identify", cfg.endpoint.trim_end_matches('/')),
            write_key: cfg.write_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AnalyticsSink for SegmentSink {
    async fn identify(&self, event: Identify) -> Result<(), ForwardError> {
        let payload = IdentifyPayload {
            kind: "identify",
            user_id: &event.user_id,
            traits: &event.traits,
            message_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            context: PayloadContext {
                library: Library {
                    name: LIBRARY_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                },
            },
        };
        let body = serde_json::to_vec(&payload).map_err(|e| ForwardError::Encode(e.to_string()))?;

        let resp = self
            .client
            .post(&self.url)
            .basic_auth(&self.write_key, Some(""))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ForwardError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ForwardError::Rejected {
                status: status.as_u16(),
            });
        }
        tracing::debug!(user_id = %event.user_id, message_id = %payload.message_id, "identify delivered");
        Ok(())
    }
}

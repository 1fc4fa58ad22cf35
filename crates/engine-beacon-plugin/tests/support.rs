//! Scripted sources and recording sinks for reporter tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use engine_beacon_core::{Label, Metric, MetricFamily, MetricType, Value};
use engine_beacon_plugin::config::ReporterSection;
use engine_beacon_plugin::{AnalyticsSink, ForwardError, GatherError, Identify, MetricsSource};

/// Records every identify call.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Identify>>,
    notify: Notify,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Identify> {
        self.events.lock().unwrap().clone()
    }

    pub async fn wait_for(&self, n: usize, within: Duration) -> Vec<Identify> {
        tokio::time::timeout(within, async {
            loop {
                let notified = self.notify.notified();
                if self.events.lock().unwrap().len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {n} identify calls, saw {}", self.events().len()));
        self.events()
    }
}

#[async_trait]
impl AnalyticsSink for RecordingSink {
    async fn identify(&self, event: Identify) -> Result<(), ForwardError> {
        self.events.lock().unwrap().push(event);
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Rejects every event.
pub struct RejectingSink;

#[async_trait]
impl AnalyticsSink for RejectingSink {
    async fn identify(&self, _event: Identify) -> Result<(), ForwardError> {
        Err(ForwardError::Rejected { status: 503 })
    }
}

/// Returns the same families on every gather.
pub struct StaticSource(pub Vec<MetricFamily>);

#[async_trait]
impl MetricsSource for StaticSource {
    async fn gather(&self, _cancel: &CancellationToken) -> Result<Vec<MetricFamily>, GatherError> {
        Ok(self.0.clone())
    }
}

/// Wraps a source and records whether each gather ended by cancellation.
pub struct ObservingSource<S> {
    pub inner: S,
    pub outcomes: Arc<Mutex<Vec<bool>>>,
}

#[async_trait]
impl<S: MetricsSource> MetricsSource for ObservingSource<S> {
    async fn gather(&self, cancel: &CancellationToken) -> Result<Vec<MetricFamily>, GatherError> {
        let r = self.inner.gather(cancel).await;
        let cancelled = matches!(&r, Err(e) if e.is_cancelled());
        self.outcomes.lock().unwrap().push(cancelled);
        r
    }
}

pub fn engine_info(labels: &[(&str, &str)]) -> MetricFamily {
    MetricFamily::new("engine_daemon_engine_info", MetricType::Gauge).with_metric(Metric::new(
        labels.iter().map(|(k, v)| Label::new(*k, *v)).collect(),
        Value::Gauge(1.0),
    ))
}

pub fn fast_settings(sockpath: &str) -> ReporterSection {
    ReporterSection {
        sockpath: sockpath.into(),
        interval_ms: 50,
        skip_empty_id: false,
    }
}

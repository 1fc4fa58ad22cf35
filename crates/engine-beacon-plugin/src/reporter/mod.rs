//! Reporting loop and its start/stop lifecycle.
//!
//! States: `Idle -> Running -> Stopped`. `Stopped` is terminal; a second
//! `start()` is refused with a warning. `stop()` cancels the loop and waits for
//! the task to exit, so no gather or sink call happens after it returns.

pub mod identify;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ReporterSection};
use crate::error::{ConfigError, ForwardError, GatherError};
use crate::gather::{MetricsSource, UnixSocketSource};
use crate::sink::{self, AnalyticsSink};
use crate::transport::UnixSocketClient;

pub use identify::{identify_events, ENGINE_INFO_FAMILY};

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

enum State {
    Idle,
    Running {
        cancel: CancellationToken,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// What one tick does; moved into the background task.
#[derive(Clone)]
struct Cycle {
    source: Arc<dyn MetricsSource>,
    sink: Arc<dyn AnalyticsSink>,
    skip_empty_id: bool,
}

impl Cycle {
    /// Gather, filter and forward. Returns the number of delivered events.
    async fn run(&self, cancel: &CancellationToken) -> Result<usize, GatherError> {
        let families = self.source.gather(cancel).await?;

        let mut delivered = 0;
        for event in identify_events(&families) {
            if event.user_id.is_empty() && self.skip_empty_id {
                tracing::warn!(traits = ?event.traits, "engine info without id; skipped");
                continue;
            }
            tracing::info!(user_id = %event.user_id, labels = ?event.traits, "engine info");

            let user_id = event.user_id.clone();
            match self.sink.identify(event).await {
                Ok(()) => delivered += 1,
                Err(e) => log_forward_error(&user_id, &e),
            }
        }
        Ok(delivered)
    }
}

fn log_forward_error(user_id: &str, e: &ForwardError) {
    tracing::error!(kind = e.kind().as_str(), user_id = %user_id, error = %e, "identify failed");
}

pub struct Reporter {
    settings: ReporterSection,
    cycle: Cycle,
    state: State,
}

impl Reporter {
    pub fn new(
        settings: ReporterSection,
        source: Arc<dyn MetricsSource>,
        sink: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let skip_empty_id = settings.skip_empty_id;
        Self {
            settings,
            cycle: Cycle {
                source,
                sink,
                skip_empty_id,
            },
            state: State::Idle,
        }
    }

    /// Unix socket source plus the sink the analytics section selects.
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let client = UnixSocketClient::new(&cfg.reporter.sockpath, cfg.transport.clone());
        let source = Arc::new(UnixSocketSource::new(client));
        let sink = sink::from_config(&cfg.analytics)?;
        Ok(Self::new(cfg.reporter.clone(), source, sink))
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.state {
            State::Idle => Lifecycle::Idle,
            State::Running { .. } => Lifecycle::Running,
            State::Stopped => Lifecycle::Stopped,
        }
    }

    /// Spawn the reporting loop. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        match self.state {
            State::Idle => {}
            State::Running { .. } => {
                tracing::warn!("reporter already running; start ignored");
                return;
            }
            State::Stopped => {
                tracing::warn!("reporter restart after stop is not supported; start ignored");
                return;
            }
        }

        let cancel = CancellationToken::new();
        let period = self.settings.interval();
        let task = tokio::spawn(run_loop(self.cycle.clone(), period, cancel.clone()));

        tracing::info!(
            sockpath = %self.settings.sockpath,
            interval_ms = self.settings.interval_ms,
            "reporter started"
        );
        self.state = State::Running { cancel, task };
    }

    /// Cancel the loop and wait until its task has exited.
    pub async fn stop(&mut self) {
        match std::mem::replace(&mut self.state, State::Stopped) {
            State::Running { cancel, task } => {
                cancel.cancel();
                if let Err(e) = task.await {
                    tracing::error!(error = %e, "reporter task did not exit cleanly");
                }
                tracing::info!("reporter stopped");
            }
            other => {
                tracing::warn!("reporter is not running; stop ignored");
                self.state = other;
            }
        }
    }

    /// Run one gather/forward cycle outside the timer.
    pub async fn report_once(&self, cancel: &CancellationToken) -> Result<usize, GatherError> {
        self.cycle.run(cancel).await
    }
}

async fn run_loop(cycle: Cycle, period: Duration, cancel: CancellationToken) {
    // first tick one full period after start
    let mut tick = tokio::time::interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                match cycle.run(&cancel).await {
                    Ok(delivered) => tracing::debug!(delivered, "report cycle done"),
                    Err(e) if e.is_cancelled() => tracing::debug!("report cycle cancelled"),
                    Err(e) => tracing::error!(kind = e.kind().as_str(), error = %e, "gather failed"),
                }
            }
        }
    }
    tracing::debug!("reporter loop exited");
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if let State::Running { cancel, task } = &self.state {
            cancel.cancel();
            task.abort();
        }
    }
}

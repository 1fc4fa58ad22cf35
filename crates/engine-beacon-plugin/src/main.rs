//! engine-beacon plugin binary.
//!
//! Serves the metrics plugin API on a Unix socket. `StartMetrics` starts the
//! reporter; SIGINT/SIGTERM stop it and exit.
//!
//! Environment:
//! - `ENGINE_BEACON_CONFIG`: YAML config path (defaults apply without it)
//! - `ENGINE_BEACON_WRITE_KEY`: overrides `analytics.write_key`
//! - `RUST_LOG`: log filter (default `info`)

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use engine_beacon_plugin::config::{self, Config};
use engine_beacon_plugin::{plugin, ConfigError, PluginHost, Reporter};

const CONFIG_ENV: &str = "ENGINE_BEACON_CONFIG";
const WRITE_KEY_ENV: &str = "ENGINE_BEACON_WRITE_KEY";

fn load_config() -> Result<Config, ConfigError> {
    let mut cfg = match std::env::var(CONFIG_ENV) {
        Ok(path) => config::load_from_file(&path)?,
        Err(_) => Config::default(),
    };
    if let Ok(key) = std::env::var(WRITE_KEY_ENV) {
        cfg.analytics.write_key = key;
    }
    Ok(cfg)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    let reporter = match Reporter::from_config(&cfg) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "reporter setup failed");
            return ExitCode::FAILURE;
        }
    };
    let host = Arc::new(PluginHost::new(reporter));

    let listener = match plugin::bind_socket(&cfg.plugin.socket) {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(socket = %cfg.plugin.socket, error = %e, "failed to bind plugin socket");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(socket = %cfg.plugin.socket, sockpath = %cfg.reporter.sockpath, "engine-beacon plugin starting");
    let served = plugin::serve(listener, host.clone(), shutdown_signal()).await;

    host.stop_metrics().await;
    if let Err(e) = std::fs::remove_file(&cfg.plugin.socket) {
        tracing::debug!(error = %e, "plugin socket cleanup failed");
    }

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "plugin server failed");
            ExitCode::FAILURE
        }
    }
}

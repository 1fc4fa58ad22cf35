use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_METRICS_SOCKET: &str = "/run/docker/metrics.sock";
pub const DEFAULT_PLUGIN_SOCKET: &str = "/run/docker/plugins/metrics.sock";
pub const DEFAULT_ANALYTICS_ENDPOINT: &str = "https://api.segment.io";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub version: u32,

    #[serde(default)]
    pub reporter: ReporterSection,

    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub analytics: AnalyticsSection,

    #[serde(default)]
    pub plugin: PluginSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            reporter: ReporterSection::default(),
            transport: TransportSection::default(),
            analytics: AnalyticsSection::default(),
            plugin: PluginSection::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        self.reporter.validate()?;
        self.transport.validate()?;
        self.analytics.validate()?;
        self.plugin.validate()?;
        Ok(())
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReporterSection {
    #[serde(default = "default_sockpath")]
    pub sockpath: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Drop identify events whose `id` label is missing or empty.
    #[serde(default)]
    pub skip_empty_id: bool,
}

impl Default for ReporterSection {
    fn default() -> Self {
        Self {
            sockpath: default_sockpath(),
            interval_ms: default_interval_ms(),
            skip_empty_id: false,
        }
    }
}

impl ReporterSection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sockpath.trim().is_empty() {
            return Err(invalid("reporter.sockpath must not be empty"));
        }
        if !(1000..=3_600_000).contains(&self.interval_ms) {
            return Err(invalid("reporter.interval_ms must be between 1000 and 3600000"));
        }
        Ok(())
    }

    /// Tick period, never shorter than 1 ms.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

fn default_sockpath() -> String {
    DEFAULT_METRICS_SOCKET.into()
}
fn default_interval_ms() -> u64 {
    20000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSection {
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,

    #[serde(default = "default_response_header_timeout_ms")]
    pub response_header_timeout_ms: u64,

    /// Overall budget for one fetch, body reads included.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            dial_timeout_ms: default_dial_timeout_ms(),
            response_header_timeout_ms: default_response_header_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl TransportSection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10_000).contains(&self.dial_timeout_ms) {
            return Err(invalid("transport.dial_timeout_ms must be between 1 and 10000"));
        }
        if !(1..=60_000).contains(&self.response_header_timeout_ms) {
            return Err(invalid(
                "transport.response_header_timeout_ms must be between 1 and 60000",
            ));
        }
        if self.request_timeout_ms < self.response_header_timeout_ms {
            return Err(invalid(
                "transport.request_timeout_ms must not be less than response_header_timeout_ms",
            ));
        }
        if !(1024..=64 * 1024 * 1024).contains(&self.max_body_bytes) {
            return Err(invalid("transport.max_body_bytes must be between 1024 and 67108864"));
        }
        Ok(())
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn response_header_timeout(&self) -> Duration {
        Duration::from_millis(self.response_header_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_dial_timeout_ms() -> u64 {
    100
}
fn default_response_header_timeout_ms() -> u64 {
    1000
}
fn default_request_timeout_ms() -> u64 {
    1000
}
fn default_max_body_bytes() -> usize {
    4 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Empty means events are only logged.
    #[serde(default)]
    pub write_key: String,

    #[serde(default = "default_analytics_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AnalyticsSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            write_key: String::new(),
            timeout_ms: default_analytics_timeout_ms(),
        }
    }
}

impl AnalyticsSection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(invalid("analytics.endpoint must be an http(s) url"));
        }
        if !(1..=60_000).contains(&self.timeout_ms) {
            return Err(invalid("analytics.timeout_ms must be between 1 and 60000"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_endpoint() -> String {
    DEFAULT_ANALYTICS_ENDPOINT.into()
}
fn default_analytics_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginSection {
    #[serde(default = "default_plugin_socket")]
    pub socket: String,
}

impl Default for PluginSection {
    fn default() -> Self {
        Self {
            socket: default_plugin_socket(),
        }
    }
}

impl PluginSection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.socket.trim().is_empty() {
            return Err(invalid("plugin.socket must not be empty"));
        }
        Ok(())
    }
}

fn default_plugin_socket() -> String {
    DEFAULT_PLUGIN_SOCKET.into()
}

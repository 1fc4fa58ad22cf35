//! Reporter config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use crate::error::ConfigError;

pub use schema::{AnalyticsSection, Config, PluginSection, ReporterSection, TransportSection};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config =
        serde_yaml::from_str(s).map_err(|e| ConfigError::Invalid(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

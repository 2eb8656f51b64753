//! Logging configuration and initialization.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `setupflow_core=debug,info`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{level}': {reason}")]
    Filter { level: String, reason: String },

    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

impl LoggingConfig {
    /// Filter from `RUST_LOG` if set, otherwise from `level`.
    pub fn filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level).map_err(|e| LoggingError::Filter {
            level: self.level.clone(),
            reason: e.to_string(),
        })
    }
}

/// Install the global subscriber. Call once per process.
pub fn init(cfg: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = cfg.filter()?;
    let installed = match cfg.format {
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
        LogFormat::Pretty => fmt().with_env_filter(filter).try_init(),
    };
    installed.map_err(|e| LoggingError::Install(e.to_string()))
}

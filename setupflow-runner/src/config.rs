//! Runner configuration: what to scan, where the data lives, where results go.
//!
//! One TOML file carries both the runner settings and the engine settings
//! (under `[engine]`). Every field has a default, so
//!
//! ```toml
//! symbols = ["DAX", "NDX"]
//! ```
//!
//! is a complete configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use setupflow_core::domain::Timeframe;
use setupflow_core::{ConfigError, EngineConfig};

use crate::logging::LoggingConfig;

/// Where candles come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// `{candle_dir}/{SYMBOL}_{tf}.csv`
    #[default]
    Csv,
    /// Hive-partitioned Parquet under `cache_dir`.
    Parquet,
    /// Deterministic random walk per symbol, for development only.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub source: SourceKind,
    pub candle_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Published daily levels. Missing entries are recalculated from the
    /// prior session's candles.
    pub levels_file: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Csv,
            candle_dir: PathBuf::from("data/candles"),
            cache_dir: PathBuf::from("data/cache"),
            levels_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only setup/alert log.
    pub store_path: PathBuf,
    /// Alert payloads, one JSON object per line. Alerts are only logged when unset.
    pub outbox_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("state/store.jsonl"),
            outbox_path: Some(PathBuf::from("state/outbox.jsonl")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    /// Candle history loaded per pass, ending at the scan time.
    pub lookback_hours: i64,
    pub data: DataConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            timeframe: Timeframe::M5,
            lookback_hours: 24,
            data: DataConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid {
                field: "symbols".into(),
                reason: "at least one symbol is required".into(),
            });
        }
        let mut seen = BTreeSet::new();
        for symbol in &self.symbols {
            if symbol.trim().is_empty() || !seen.insert(symbol.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "symbols".into(),
                    reason: format!("empty or duplicate symbol '{symbol}'"),
                });
            }
        }
        if self.lookback_hours <= 0 {
            return Err(ConfigError::Invalid {
                field: "lookback_hours".into(),
                reason: format!("{} must be positive", self.lookback_hours),
            });
        }
        self.engine.validate()
    }

    pub fn lookback(&self) -> Duration {
        Duration::hours(self.lookback_hours)
    }
}

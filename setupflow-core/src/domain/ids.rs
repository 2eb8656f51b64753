use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy identifier, as configured (e.g. "orb_long_5m").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(pub String);

impl StrategyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic setup ID: hash of (symbol, strategy, window start).
///
/// Re-running a detection pass over the same candles yields the same id, which
/// makes store writes idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetupId(pub String);

impl SetupId {
    pub fn from_natural_key(symbol: &str, strategy: &StrategyId, window_start: DateTime<Utc>) -> Self {
        Self(natural_key_hash(&[
            symbol,
            strategy.as_str(),
            &window_start.to_rfc3339(),
        ]))
    }
}

impl fmt::Display for SetupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic alert ID: hash of (symbol, kind, reference level, candle time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub String);

impl AlertId {
    pub fn from_natural_key(
        symbol: &str,
        kind: &str,
        level_key: &str,
        candle_timestamp: DateTime<Utc>,
    ) -> Self {
        Self(natural_key_hash(&[
            symbol,
            kind,
            level_key,
            &candle_timestamp.to_rfc3339(),
        ]))
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// BLAKE3 over length-prefixed parts, truncated to 32 hex chars.
fn natural_key_hash(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..32].to_string()
}

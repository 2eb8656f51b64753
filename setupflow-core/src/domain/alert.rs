//! Alert: a point-in-time notification event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AlertId, SetupId};
use super::levels::LevelName;
use super::setup::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    RangeBreakout,
    Retest,
    SessionSweep,
    LevelTouch,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::RangeBreakout => "range_breakout",
            AlertKind::Retest => "retest",
            AlertKind::SessionSweep => "session_sweep",
            AlertKind::LevelTouch => "level_touch",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplication key: (symbol, kind, reference level).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertKey {
    pub symbol: String,
    pub kind: AlertKind,
    pub level_key: String,
}

impl AlertKey {
    pub fn new(symbol: &str, kind: AlertKind, reference_level: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind,
            level_key: level_key(reference_level),
        }
    }
}

/// Reference level rounded for keying, so float noise does not split keys.
pub fn level_key(reference_level: f64) -> String {
    format!("{reference_level:.5}")
}

/// Immutable once created, except `delivered`, which belongs to the notifier side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub symbol: String,
    pub kind: AlertKind,
    pub price: f64,
    pub reference_level: f64,
    pub level: Option<LevelName>,
    pub direction: Option<Side>,
    pub candle_timestamp: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
    /// Setup created from the same event, if any.
    #[serde(default)]
    pub setup_id: Option<SetupId>,
    #[serde(default)]
    pub delivered: bool,
}

impl Alert {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: &str,
        kind: AlertKind,
        price: f64,
        reference_level: f64,
        level: Option<LevelName>,
        direction: Option<Side>,
        candle_timestamp: DateTime<Utc>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        let key = AlertKey::new(symbol, kind, reference_level);
        Self {
            id: AlertId::from_natural_key(symbol, kind.as_str(), &key.level_key, candle_timestamp),
            symbol: symbol.to_string(),
            kind,
            price,
            reference_level,
            level,
            direction,
            candle_timestamp,
            detected_at,
            setup_id: None,
            delivered: false,
        }
    }

    pub fn with_setup(mut self, setup_id: Option<SetupId>) -> Self {
        self.setup_id = setup_id;
        self
    }

    pub fn key(&self) -> AlertKey {
        AlertKey::new(&self.symbol, self.kind, self.reference_level)
    }

    /// Structured payload handed to the delivery side.
    pub fn payload(&self) -> AlertPayload {
        AlertPayload {
            alert_id: self.id.clone(),
            kind: self.kind,
            symbol: self.symbol.clone(),
            price: self.price,
            reference_level: self.reference_level,
            level: self.level,
            direction: self.direction,
            candle_timestamp: self.candle_timestamp,
            detected_at: self.detected_at,
            setup_id: self.setup_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub alert_id: AlertId,
    pub kind: AlertKind,
    pub symbol: String,
    pub price: f64,
    pub reference_level: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LevelName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Side>,
    pub candle_timestamp: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_id: Option<SetupId>,
}

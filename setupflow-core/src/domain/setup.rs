//! Setup: a proposed trade tracked through its lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::ids::{SetupId, StrategyId};
use super::levels::LevelName;
use crate::risk::InstrumentClass;
use crate::validation::Metric;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("long"),
            Side::Short => f.write_str("short"),
        }
    }
}

/// Strategy priority tier. Tier 1 overrides tier 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Primary,
    Secondary,
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Primary),
            2 => Ok(Priority::Secondary),
            other => Err(format!("priority must be 1 or 2, got {other}")),
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        match p {
            Priority::Primary => 1,
            Priority::Secondary => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupStatus {
    /// Created, awaiting entry.
    Pending,
    /// Entry confirmed.
    Active,
    /// Take-profit reached.
    Filled,
    /// Stop-loss reached.
    Invalid,
    /// Superseded, expired or rejected before activation.
    Cancelled,
}

impl SetupStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SetupStatus::Filled | SetupStatus::Invalid | SetupStatus::Cancelled
        )
    }
}

impl fmt::Display for SetupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SetupStatus::Pending => "pending",
            SetupStatus::Active => "active",
            SetupStatus::Filled => "filled",
            SetupStatus::Invalid => "invalid",
            SetupStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why a setup reached its terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CloseReason {
    TargetHit,
    StopHit,
    /// Stopped out after the stop was moved to entry.
    BreakevenStop,
    Superseded { by: SetupId },
    Expired,
    RiskRejected { detail: String },
}

/// Detection context captured when the setup was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionContext {
    RangeBreakout {
        range_high: f64,
        range_low: f64,
        breakout_close: f64,
        volume: f64,
        candle_timestamp: DateTime<Utc>,
    },
    Retest {
        edge: f64,
        breakout_timestamp: DateTime<Utc>,
        retest_extreme: f64,
        volume: f64,
        candle_timestamp: DateTime<Utc>,
    },
    SessionSweep {
        reference_level: f64,
        sweep_extreme: f64,
        sweep_timestamp: DateTime<Utc>,
        confirm_candles: usize,
        candle_timestamp: DateTime<Utc>,
    },
    LevelTouch {
        level: LevelName,
        level_price: f64,
        touch_price: f64,
        volume: f64,
        candle_timestamp: DateTime<Utc>,
    },
}

impl DetectionContext {
    /// Timestamp of the candle that triggered detection.
    pub fn candle_timestamp(&self) -> DateTime<Utc> {
        match self {
            DetectionContext::RangeBreakout { candle_timestamp, .. }
            | DetectionContext::Retest { candle_timestamp, .. }
            | DetectionContext::SessionSweep { candle_timestamp, .. }
            | DetectionContext::LevelTouch { candle_timestamp, .. } => *candle_timestamp,
        }
    }
}

/// A proposed trade. Owned by the lifecycle engine from creation to terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    pub id: SetupId,
    pub symbol: String,
    pub strategy: StrategyId,
    pub side: Side,
    pub priority: Priority,
    pub entry: f64,
    pub stop_loss: f64,
    /// Stop at creation; R-multiples are measured against it.
    pub initial_stop: f64,
    pub take_profit: f64,
    pub confidence: f64,
    pub breakdown: BTreeMap<Metric, f64>,
    pub status: SetupStatus,
    pub instrument: InstrumentClass,
    pub position_size: f64,
    pub leverage: f64,
    pub risk_amount: f64,
    pub levels_date: Option<NaiveDate>,
    pub context: DetectionContext,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Newest candle already applied to this setup.
    pub last_evaluated: DateTime<Utc>,
    pub breakeven_moved: bool,
    pub close_reason: Option<CloseReason>,
    pub exit_price: Option<f64>,
    pub realized_r: Option<f64>,
}

impl Setup {
    /// Distance between entry and the initial stop.
    pub fn initial_risk_per_unit(&self) -> f64 {
        (self.entry - self.initial_stop).abs()
    }

    /// Closed at a loss (stop hit below entry for long, above for short).
    pub fn is_loss(&self) -> bool {
        self.status == SetupStatus::Invalid && self.realized_r.is_some_and(|r| r < 0.0)
    }

    /// True if the validity windows `[created_at, expires_at]` intersect.
    pub fn overlaps(&self, other: &Setup) -> bool {
        self.created_at <= other.expires_at && other.created_at <= self.expires_at
    }

    /// Calendar date of closure, if closed.
    pub fn closed_on(&self) -> Option<NaiveDate> {
        self.closed_at.map(|t| t.date_naive())
    }
}

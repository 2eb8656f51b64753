//! Daily reference levels: pivots plus the prior session's extremes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::Candle;
use crate::indicators::pivot_points;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelName {
    Pivot,
    R1,
    R2,
    S1,
    S2,
    PriorHigh,
    PriorLow,
    PriorClose,
}

impl LevelName {
    pub fn as_str(self) -> &'static str {
        match self {
            LevelName::Pivot => "pivot",
            LevelName::R1 => "r1",
            LevelName::R2 => "r2",
            LevelName::S1 => "s1",
            LevelName::S2 => "s2",
            LevelName::PriorHigh => "prior_high",
            LevelName::PriorLow => "prior_low",
            LevelName::PriorClose => "prior_close",
        }
    }
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LevelsError {
    #[error("{symbol} {date}: prior session high {high} below low {low}")]
    InvertedRange {
        symbol: String,
        date: NaiveDate,
        high: f64,
        low: f64,
    },

    #[error("{symbol} {date}: non-finite or non-positive prior session price")]
    InvalidPrice { symbol: String, date: NaiveDate },
}

/// Pivot levels for one symbol and trading day. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLevels {
    pub symbol: String,
    pub date: NaiveDate,
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub s1: f64,
    pub s2: f64,
    pub prior_high: f64,
    pub prior_low: f64,
    pub prior_close: f64,
}

impl DailyLevels {
    /// Levels for `date` from the previous session's high/low/close.
    pub fn from_prior_session(
        symbol: impl Into<String>,
        date: NaiveDate,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<Self, LevelsError> {
        let symbol = symbol.into();
        if [high, low, close].iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(LevelsError::InvalidPrice { symbol, date });
        }
        if high < low {
            return Err(LevelsError::InvertedRange {
                symbol,
                date,
                high,
                low,
            });
        }
        let p = pivot_points(high, low, close);
        Ok(Self {
            symbol,
            date,
            pivot: p.pp,
            r1: p.r1,
            r2: p.r2,
            s1: p.s1,
            s2: p.s2,
            prior_high: high,
            prior_low: low,
            prior_close: close,
        })
    }

    /// Levels for `date` from all candles of the prior session.
    ///
    /// Returns `None` when `prior_session` is empty.
    pub fn from_session_candles(
        symbol: impl Into<String>,
        date: NaiveDate,
        prior_session: &[Candle],
    ) -> Option<Result<Self, LevelsError>> {
        let last = prior_session.last()?;
        let high = prior_session.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = prior_session.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        Some(Self::from_prior_session(symbol, date, high, low, last.close))
    }

    /// All named levels in declaration order.
    pub fn levels(&self) -> [(LevelName, f64); 8] {
        [
            (LevelName::Pivot, self.pivot),
            (LevelName::R1, self.r1),
            (LevelName::R2, self.r2),
            (LevelName::S1, self.s1),
            (LevelName::S2, self.s2),
            (LevelName::PriorHigh, self.prior_high),
            (LevelName::PriorLow, self.prior_low),
            (LevelName::PriorClose, self.prior_close),
        ]
    }

    pub fn get(&self, name: LevelName) -> f64 {
        match name {
            LevelName::Pivot => self.pivot,
            LevelName::R1 => self.r1,
            LevelName::R2 => self.r2,
            LevelName::S1 => self.s1,
            LevelName::S2 => self.s2,
            LevelName::PriorHigh => self.prior_high,
            LevelName::PriorLow => self.prior_low,
            LevelName::PriorClose => self.prior_close,
        }
    }

    /// Level closest to `price`.
    pub fn nearest(&self, price: f64) -> (LevelName, f64) {
        let mut best = (LevelName::Pivot, self.pivot);
        for (name, level) in self.levels() {
            if (level - price).abs() < (best.1 - price).abs() {
                best = (name, level);
            }
        }
        best
    }
}

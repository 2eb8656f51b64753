//! Domain types for the decision pipeline.

pub mod alert;
pub mod candle;
pub mod ids;
pub mod levels;
pub mod setup;

pub use alert::{Alert, AlertKey, AlertKind, AlertPayload};
pub use candle::{Candle, CandleError, Timeframe};
pub use ids::{AlertId, SetupId, StrategyId};
pub use levels::{DailyLevels, LevelName, LevelsError};
pub use setup::{CloseReason, DetectionContext, Priority, Setup, SetupStatus, Side};

use std::collections::BTreeMap;

/// Latest candle per symbol, captured once at the start of a pass.
///
/// Passed down explicitly so every check in a pass sees the same prices.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    latest: BTreeMap<String, Candle>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from per-symbol candle series, keeping the newest candle of each.
    pub fn from_series<'a>(series: impl IntoIterator<Item = &'a [Candle]>) -> Self {
        let mut snap = Self::new();
        for candles in series {
            if let Some(last) = candles.iter().max_by_key(|c| c.timestamp) {
                snap.insert(last.clone());
            }
        }
        snap
    }

    pub fn insert(&mut self, candle: Candle) {
        match self.latest.get(&candle.symbol) {
            Some(existing) if existing.timestamp >= candle.timestamp => {}
            _ => {
                self.latest.insert(candle.symbol.clone(), candle);
            }
        }
    }

    pub fn latest(&self, symbol: &str) -> Option<&Candle> {
        self.latest.get(symbol)
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.latest(symbol).map(|c| c.close)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

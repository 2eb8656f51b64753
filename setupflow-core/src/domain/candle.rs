//! Candle: the fundamental market data unit.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Candle resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    /// Wall-clock span covered by one candle.
    pub fn duration(self) -> Duration {
        match self {
            Timeframe::M1 => Duration::minutes(1),
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::M30 => Duration::minutes(30),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "m1",
            Timeframe::M5 => "m5",
            Timeframe::M15 => "m15",
            Timeframe::M30 => "m30",
            Timeframe::H1 => "h1",
            Timeframe::H4 => "h4",
            Timeframe::D1 => "d1",
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = CandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m1" | "1m" => Ok(Timeframe::M1),
            "m5" | "5m" => Ok(Timeframe::M5),
            "m15" | "15m" => Ok(Timeframe::M15),
            "m30" | "30m" => Ok(Timeframe::M30),
            "h1" | "1h" => Ok(Timeframe::H1),
            "h4" | "4h" => Ok(Timeframe::H4),
            "d1" | "1d" => Ok(Timeframe::D1),
            other => Err(CandleError::UnknownTimeframe(other.to_string())),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CandleError {
    #[error("{symbol} @ {timestamp}: non-finite or non-positive price")]
    InvalidPrice {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("{symbol} @ {timestamp}: OHLC invariant violated (o={open}, h={high}, l={low}, c={close})")]
    InconsistentRange {
        symbol: String,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("{symbol} @ {timestamp}: negative volume {volume}")]
    NegativeVolume {
        symbol: String,
        timestamp: DateTime<Utc>,
        volume: f64,
    },

    #[error("unknown timeframe '{0}'")]
    UnknownTimeframe(String),
}

/// One OHLCV observation for a symbol at a timeframe. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Build a candle, enforcing `high >= max(open, close)`, `low <= min(open, close)`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleError> {
        let candle = Self {
            symbol: symbol.into(),
            timeframe,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        candle.check()?;
        Ok(candle)
    }

    /// Re-run the invariant checks (used after deserialization).
    pub fn check(&self) -> Result<(), CandleError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(CandleError::InvalidPrice {
                symbol: self.symbol.clone(),
                timestamp: self.timestamp,
            });
        }
        if self.high < self.open.max(self.close)
            || self.low > self.open.min(self.close)
            || self.high < self.low
        {
            return Err(CandleError::InconsistentRange {
                symbol: self.symbol.clone(),
                timestamp: self.timestamp,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }
        if !(self.volume >= 0.0) {
            return Err(CandleError::NegativeVolume {
                symbol: self.symbol.clone(),
                timestamp: self.timestamp,
                volume: self.volume,
            });
        }
        Ok(())
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Calendar date of the candle in UTC.
    pub fn trading_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// True if `[low, high]` intersects `[price - band, price + band]`.
    pub fn touches(&self, price: f64, band: f64) -> bool {
        self.low <= price + band && self.high >= price - band
    }
}

/// Closing prices of a candle slice.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Volumes of a candle slice.
pub fn volumes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.volume).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap()
    }

    #[test]
    fn new_accepts_consistent_candle() {
        let c = Candle::new("DAX", Timeframe::M5, ts(), 100.0, 105.0, 98.0, 103.0, 1_000.0).unwrap();
        assert_eq!(c.body(), 3.0);
        assert_eq!(c.range(), 7.0);
        assert_eq!(c.upper_wick(), 2.0);
        assert_eq!(c.lower_wick(), 2.0);
        assert!(c.is_bullish());
    }

    #[test]
    fn new_rejects_high_below_close() {
        let err = Candle::new("DAX", Timeframe::M5, ts(), 100.0, 102.0, 98.0, 103.0, 1.0).unwrap_err();
        assert!(matches!(err, CandleError::InconsistentRange { .. }));
    }

    #[test]
    fn new_rejects_non_positive_price() {
        let err = Candle::new("DAX", Timeframe::M5, ts(), 0.0, 102.0, 0.0, 101.0, 1.0).unwrap_err();
        assert!(matches!(err, CandleError::InvalidPrice { .. }));
    }

    #[test]
    fn new_rejects_negative_volume() {
        let err = Candle::new("DAX", Timeframe::M5, ts(), 100.0, 102.0, 99.0, 101.0, -5.0).unwrap_err();
        assert!(matches!(err, CandleError::NegativeVolume { .. }));
    }

    #[test]
    fn touches_uses_band_on_both_sides() {
        let c = Candle::new("DAX", Timeframe::M5, ts(), 100.0, 101.0, 99.0, 100.5, 1.0).unwrap();
        assert!(c.touches(101.05, 0.1));
        assert!(!c.touches(101.2, 0.1));
        assert!(c.touches(98.95, 0.1));
    }

    #[test]
    fn timeframe_parses_both_spellings() {
        assert_eq!("m5".parse::<Timeframe>().unwrap(), Timeframe::M5);
        assert_eq!("1H".parse::<Timeframe>().unwrap(), Timeframe::H1);
        assert!("w1".parse::<Timeframe>().is_err());
    }

    #[test]
    fn candle_serialization_roundtrip() {
        let c = Candle::new("DAX", Timeframe::M15, ts(), 100.0, 105.0, 98.0, 103.0, 10.0).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}

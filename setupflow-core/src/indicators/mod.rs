//! Indicator Engine.
//!
//! Pure, stateless functions over closing prices, volumes or candles. No I/O and
//! no hidden state: the same input always yields the same output.
//!
//! Outputs are compact: one value per complete window, aligned with the end of the
//! input. A series of length `n` through a `period` window yields `n - period + 1`
//! values, so `output.last()` always describes the newest candle. Windows that
//! cannot be filled are an error (`IndicatorError::InsufficientData`), never a
//! zero-filled or NaN-padded value.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod error;
pub mod macd;
pub mod pivots;
pub mod rsi;
pub mod sma;
pub mod snapshot;
pub mod trend;

pub use atr::{atr, true_range};
pub use bollinger::{bollinger, BollingerPoint, BollingerSeries};
pub use ema::ema;
pub use error::IndicatorError;
pub use macd::{macd, macd_crossover, Crossover, MacdPoint, MacdSeries};
pub use pivots::{pivot_points, PivotLevels};
pub use rsi::rsi;
pub use sma::{average_volume, sma};
pub use snapshot::IndicatorSnapshot;
pub use trend::{classify_trend, trend, Trend};

pub(crate) fn check_window(
    indicator: &'static str,
    period: usize,
    required: usize,
    available: usize,
) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator, period });
    }
    if available < required {
        return Err(IndicatorError::InsufficientData {
            indicator,
            required,
            available,
        });
    }
    Ok(())
}

/// Candles from close prices for tests.
///
/// open = prev close (or close for the first candle), high/low = body ± 1.0,
/// volume = 1000, one candle every five minutes.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<crate::domain::Candle> {
    use crate::domain::{Candle, Timeframe};
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                symbol: "TEST".to_string(),
                timeframe: Timeframe::M5,
                timestamp: base + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

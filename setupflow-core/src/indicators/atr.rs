//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR here is the simple rolling mean of true range. The first candle has no
//! previous close, so the true range series starts at the second candle.

use crate::domain::Candle;

use super::sma::sma;
use super::{check_window, IndicatorError};

pub const DEFAULT_ATR_PERIOD: usize = 14;

/// True range for every candle after the first. Length: `candles.len() - 1`.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|w| {
            let (h, l, pc) = (w[1].high, w[1].low, w[0].close);
            (h - l).max((h - pc).abs()).max((l - pc).abs())
        })
        .collect()
}

/// ATR series. Needs `period + 1` candles; output length `candles.len() - period`.
pub fn atr(candles: &[Candle], period: usize) -> Result<Vec<f64>, IndicatorError> {
    check_window("atr", period, period + 1, candles.len())?;
    sma(&true_range(candles), period)
}

//! Moving Average Convergence/Divergence (MACD).
//!
//! macd = EMA(fast) - EMA(slow), signal = EMA(macd, signal_period),
//! histogram = macd - signal. All three series are tail-aligned and share the
//! histogram's length.

use serde::{Deserialize, Serialize};

use super::ema::ema;
use super::{check_window, IndicatorError};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Latest MACD values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl MacdSeries {
    pub fn last(&self) -> Option<MacdPoint> {
        let i = self.histogram.len().checked_sub(1)?;
        Some(MacdPoint {
            macd: self.macd[i],
            signal: self.signal[i],
            histogram: self.histogram[i],
        })
    }
}

/// Discrete crossover event derived from consecutive histogram values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crossover {
    Bullish,
    Bearish,
    None,
}

/// MACD with the given periods. Needs `slow + signal - 1` values.
pub fn macd(
    values: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdSeries, IndicatorError> {
    if fast == 0 || slow == 0 || signal == 0 || fast >= slow {
        return Err(IndicatorError::InvalidPeriod {
            indicator: "macd",
            period: fast.min(slow).min(signal),
        });
    }
    check_window("macd", slow, slow + signal - 1, values.len())?;

    let fast_ema = ema(values, fast)?;
    let slow_ema = ema(values, slow)?;

    // Align fast EMA to the slow EMA's start
    let offset = slow - fast;
    let macd_line: Vec<f64> = slow_ema
        .iter()
        .zip(&fast_ema[offset..])
        .map(|(s, f)| f - s)
        .collect();

    let signal_line = ema(&macd_line, signal)?;
    let macd_tail = macd_line[signal - 1..].to_vec();
    let histogram = macd_tail
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Ok(MacdSeries {
        macd: macd_tail,
        signal: signal_line,
        histogram,
    })
}

/// Crossover between the last two histogram values.
pub fn macd_crossover(histogram: &[f64]) -> Crossover {
    match histogram {
        [.., prev, cur] => classify(*prev, *cur),
        _ => Crossover::None,
    }
}

/// Crossover at each histogram step (length `histogram.len() - 1`).
pub fn crossovers(histogram: &[f64]) -> Vec<Crossover> {
    histogram.windows(2).map(|w| classify(w[0], w[1])).collect()
}

fn classify(prev: f64, cur: f64) -> Crossover {
    if prev <= 0.0 && cur > 0.0 {
        Crossover::Bullish
    } else if prev >= 0.0 && cur < 0.0 {
        Crossover::Bearish
    } else {
        Crossover::None
    }
}

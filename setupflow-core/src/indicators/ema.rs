//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * value[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: the first output is the SMA of the first `period` values.

use super::{check_window, IndicatorError};

/// EMA of a series. Output length: `values.len() - period + 1`.
pub fn ema(values: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    check_window("ema", period, period, values.len())?;

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);

    let mut prev = seed;
    for &v in &values[period..] {
        let next = alpha * v + (1.0 - alpha) * prev;
        out.push(next);
        prev = next;
    }

    Ok(out)
}

/// Latest EMA value.
pub fn ema_last(values: &[f64], period: usize) -> Result<f64, IndicatorError> {
    // ema() always yields at least one value on success
    ema(values, period).map(|s| s[s.len() - 1])
}

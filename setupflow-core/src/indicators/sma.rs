//! Simple Moving Average (SMA).
//!
//! SMA[t] = mean(values[t-period+1..=t]), computed with a running sum.

use super::{check_window, IndicatorError};

/// Rolling mean. Output length: `values.len() - period + 1`.
pub fn sma(values: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    check_window("sma", period, period, values.len())?;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut sum: f64 = values[..period].iter().sum();
    out.push(sum / period as f64);

    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out.push(sum / period as f64);
    }

    Ok(out)
}

/// Mean volume over the last `period` candles.
pub fn average_volume(volumes: &[f64], period: usize) -> Result<f64, IndicatorError> {
    check_window("average_volume", period, period, volumes.len())?;
    let window = &volumes[volumes.len() - period..];
    Ok(window.iter().sum::<f64>() / period as f64)
}

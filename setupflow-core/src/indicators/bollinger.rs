//! Bollinger Bands: moving average +/- `k` standard deviations.
//!
//! Uses population stddev (divide by N).
//! Width = (upper - lower) / middle, a unitless volatility proxy.

use serde::{Deserialize, Serialize};

use super::{check_window, IndicatorError};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
    pub width: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: f64,
}

impl BollingerSeries {
    pub fn last(&self) -> Option<BollingerPoint> {
        let i = self.middle.len().checked_sub(1)?;
        Some(BollingerPoint {
            upper: self.upper[i],
            middle: self.middle[i],
            lower: self.lower[i],
            width: self.width[i],
        })
    }
}

/// Bands over a rolling window. Output length: `values.len() - period + 1`.
pub fn bollinger(
    values: &[f64],
    period: usize,
    multiplier: f64,
) -> Result<BollingerSeries, IndicatorError> {
    check_window("bollinger", period, period, values.len())?;

    let n = values.len() - period + 1;
    let mut series = BollingerSeries {
        upper: Vec::with_capacity(n),
        middle: Vec::with_capacity(n),
        lower: Vec::with_capacity(n),
        width: Vec::with_capacity(n),
    };

    for window in values.windows(period) {
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        let upper = mean + multiplier * stddev;
        let lower = mean - multiplier * stddev;
        let width = if mean != 0.0 { (upper - lower) / mean } else { 0.0 };

        series.upper.push(upper);
        series.middle.push(mean);
        series.lower.push(lower);
        series.width.push(width);
    }

    Ok(series)
}

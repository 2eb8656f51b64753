//! Trend classification from three moving averages.

use serde::{Deserialize, Serialize};

use super::ema::ema_last;
use super::IndicatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

/// Bullish only when short > medium > long and price > long; bearish mirrors it.
pub fn classify_trend(price: f64, short: f64, medium: f64, long: f64) -> Trend {
    if short > medium && medium > long && price > long {
        Trend::Bullish
    } else if short < medium && medium < long && price < long {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

/// Classify the newest value of `values` using EMAs of the three periods.
pub fn trend(
    values: &[f64],
    short: usize,
    medium: usize,
    long: usize,
) -> Result<Trend, IndicatorError> {
    let price = match values.last() {
        Some(p) => *p,
        None => {
            return Err(IndicatorError::InsufficientData {
                indicator: "trend",
                required: long.max(1),
                available: 0,
            })
        }
    };
    Ok(classify_trend(
        price,
        ema_last(values, short)?,
        ema_last(values, medium)?,
        ema_last(values, long)?,
    ))
}

//! The five sub-scores. Each returns a value in [0, 1].

use crate::config::ValidationConfig;
use crate::domain::{Candle, DailyLevels, Side};
use crate::indicators::{Crossover, IndicatorSnapshot, Trend};

use super::patterns::detect_pattern;

/// Share of the directional orderings price/short, short/medium, medium/long
/// that agree with `side`.
pub fn ema_alignment(side: Side, snap: &IndicatorSnapshot) -> f64 {
    let pairs = [
        (snap.price, snap.ema_short),
        (snap.ema_short, snap.ema_medium),
        (snap.ema_medium, snap.ema_long),
    ];
    let satisfied = pairs
        .iter()
        .filter(|(a, b)| match side {
            Side::Long => a > b,
            Side::Short => a < b,
        })
        .count();
    satisfied as f64 / pairs.len() as f64
}

/// `1 - min(distance / band, 1)` to the nearest daily level. No levels scores 0.
pub fn pivot_confluence(price: f64, levels: Option<&DailyLevels>, band_pct: f64) -> f64 {
    let Some(levels) = levels else {
        return 0.0;
    };
    let band = price * band_pct;
    if band <= 0.0 {
        return 0.0;
    }
    let (_, nearest) = levels.nearest(price);
    1.0 - ((nearest - price).abs() / band).min(1.0)
}

/// `min(current / average, 2) / 2`.
pub fn volume_confirmation(current: f64, average: f64) -> f64 {
    if average <= 0.0 || !current.is_finite() {
        return 0.0;
    }
    (current / average).clamp(0.0, 2.0) / 2.0
}

pub fn candle_structure(side: Side, candles: &[Candle]) -> f64 {
    detect_pattern(candles, side).score(side)
}

/// Trend agreement (0.5), volatility regime (0.3), momentum (0.2).
pub fn context_flow(side: Side, snap: &IndicatorSnapshot, cfg: &ValidationConfig) -> f64 {
    let trend = match (snap.trend, side) {
        (Trend::Bullish, Side::Long) | (Trend::Bearish, Side::Short) => 0.5,
        (Trend::Neutral, _) => 0.25,
        _ => 0.0,
    };

    let width = snap.bollinger.width;
    let volatility = if width >= cfg.min_band_width && width <= cfg.max_band_width {
        0.3
    } else {
        0.0
    };

    let rsi_ok = match side {
        Side::Long => (50.0..=70.0).contains(&snap.rsi),
        Side::Short => (30.0..=50.0).contains(&snap.rsi),
    };
    let macd_ok = match side {
        Side::Long => snap.macd.histogram > 0.0 || snap.macd_crossover == Crossover::Bullish,
        Side::Short => snap.macd.histogram < 0.0 || snap.macd_crossover == Crossover::Bearish,
    };
    let momentum = 0.1 * f64::from(u8::from(rsi_ok)) + 0.1 * f64::from(u8::from(macd_ok));

    trend + volatility + momentum
}

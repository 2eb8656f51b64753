//! Latest indicator values for one symbol, as consumed by the Validation Engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::IndicatorConfig;
use crate::domain::candle::{closes, volumes};
use crate::domain::Candle;

use super::ema::ema_last;
use super::{
    atr, average_volume, bollinger, check_window, classify_trend, macd, macd_crossover, rsi,
    BollingerPoint, Crossover, IndicatorError, MacdPoint, Trend,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub ema_short: f64,
    pub ema_medium: f64,
    pub ema_long: f64,
    pub rsi: f64,
    pub macd: MacdPoint,
    pub macd_crossover: Crossover,
    pub bollinger: BollingerPoint,
    pub atr: f64,
    pub volume: f64,
    pub avg_volume: f64,
    pub trend: Trend,
}

impl IndicatorSnapshot {
    /// Minimum candle count for every indicator in `cfg` to produce a value.
    pub fn required_candles(cfg: &IndicatorConfig) -> usize {
        [
            cfg.ema_long,
            cfg.ema_medium,
            cfg.ema_short,
            cfg.rsi_period + 1,
            cfg.macd_slow + cfg.macd_signal - 1,
            cfg.bollinger_period,
            cfg.atr_period + 1,
            cfg.volume_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }

    /// Compute all indicators on `candles` and keep the newest value of each.
    pub fn compute(candles: &[Candle], cfg: &IndicatorConfig) -> Result<Self, IndicatorError> {
        check_window(
            "snapshot",
            cfg.ema_long,
            Self::required_candles(cfg),
            candles.len(),
        )?;

        let close = closes(candles);
        let vols = volumes(candles);
        let newest = &candles[candles.len() - 1];

        let ema_short = ema_last(&close, cfg.ema_short)?;
        let ema_medium = ema_last(&close, cfg.ema_medium)?;
        let ema_long = ema_last(&close, cfg.ema_long)?;

        let rsi_series = rsi(&close, cfg.rsi_period)?;
        let macd_series = macd(&close, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal)?;
        let bands = bollinger(&close, cfg.bollinger_period, cfg.bollinger_multiplier)?;
        let atr_series = atr(candles, cfg.atr_period)?;

        let insufficient = |indicator| IndicatorError::InsufficientData {
            indicator,
            required: 1,
            available: 0,
        };

        Ok(Self {
            timestamp: newest.timestamp,
            price: newest.close,
            ema_short,
            ema_medium,
            ema_long,
            rsi: *rsi_series.last().ok_or_else(|| insufficient("rsi"))?,
            macd: macd_series.last().ok_or_else(|| insufficient("macd"))?,
            macd_crossover: macd_crossover(&macd_series.histogram),
            bollinger: bands.last().ok_or_else(|| insufficient("bollinger"))?,
            atr: *atr_series.last().ok_or_else(|| insufficient("atr"))?,
            volume: newest.volume,
            avg_volume: average_volume(&vols, cfg.volume_period)?,
            trend: classify_trend(newest.close, ema_short, ema_medium, ema_long),
        })
    }
}

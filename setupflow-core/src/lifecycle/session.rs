//! Intraday session references: the opening range and the sweep reference range.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::config::{OpeningRangeConfig, SessionWindow};
use crate::domain::Candle;

/// High/low of the first `minutes` after the session open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpeningRange {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
    /// First instant after the range; breakouts are only looked for from here.
    pub end: DateTime<Utc>,
}

/// Opening range of `date`, or `None` if no candle falls inside it.
pub fn opening_range(
    candles: &[Candle],
    date: NaiveDate,
    cfg: &OpeningRangeConfig,
) -> Option<OpeningRange> {
    let start = date.and_time(cfg.session_open).and_utc();
    let end = start + Duration::minutes(i64::from(cfg.minutes));
    let (high, low) = extremes(
        candles
            .iter()
            .filter(|c| c.timestamp >= start && c.timestamp < end),
    )?;
    Some(OpeningRange {
        date,
        high,
        low,
        end,
    })
}

/// High/low of the candles of `date` inside `window` that start before `before`.
pub fn session_extremes(
    candles: &[Candle],
    date: NaiveDate,
    window: SessionWindow,
    before: DateTime<Utc>,
) -> Option<(f64, f64)> {
    extremes(candles.iter().filter(|c| {
        c.trading_date() == date && window.contains(c.timestamp.time()) && c.timestamp < before
    }))
}

fn extremes<'a>(candles: impl Iterator<Item = &'a Candle>) -> Option<(f64, f64)> {
    candles.fold(None, |acc, c| match acc {
        None => Some((c.high, c.low)),
        Some((h, l)) => Some((h.max(c.high), l.min(c.low))),
    })
}

//! Event detection.
//!
//! Four detectors run independently over each candle: opening-range breakout,
//! retest of a broken edge, session sweep with delayed confirmation, and
//! daily-level touch. Each detector yields at most one event per candle.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

use super::session::{opening_range, session_extremes, OpeningRange};
use crate::config::DetectionConfig;
use crate::domain::{AlertKind, Candle, DailyLevels, DetectionContext, LevelName, Side};

/// A detected market event, tied to the candle that triggered it.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketEvent {
    pub kind: AlertKind,
    pub symbol: String,
    /// Index of the triggering candle in the detector input.
    pub candle_index: usize,
    pub candle_timestamp: DateTime<Utc>,
    pub price: f64,
    pub reference_level: f64,
    pub level: Option<LevelName>,
    pub direction: Option<Side>,
    pub context: DetectionContext,
}

/// Breakout that a later candle may retest.
#[derive(Debug, Clone, Copy)]
struct Breakout {
    side: Side,
    edge: f64,
    timestamp: DateTime<Utc>,
}

/// Run every detector over `candles` (oldest first).
///
/// `levels` is only used for candles on its own trading date.
pub fn detect_events(
    candles: &[Candle],
    levels: Option<&DailyLevels>,
    cfg: &DetectionConfig,
) -> Vec<MarketEvent> {
    let mut events = Vec::new();
    let mut ranges: BTreeMap<NaiveDate, Option<OpeningRange>> = BTreeMap::new();
    let mut last_breakout: Option<Breakout> = None;

    for (i, candle) in candles.iter().enumerate() {
        let date = candle.trading_date();
        let range = *ranges
            .entry(date)
            .or_insert_with(|| opening_range(candles, date, &cfg.opening_range));
        if last_breakout.is_some_and(|b| b.timestamp.date_naive() != date) {
            last_breakout = None;
        }

        let mut breakout_now = None;
        if let Some(range) = range {
            if let Some(event) = breakout(candles, i, &range) {
                breakout_now = event.direction.map(|side| Breakout {
                    side,
                    edge: event.reference_level,
                    timestamp: candle.timestamp,
                });
                events.push(event);
            }
        }

        if let Some(b) = last_breakout {
            if let Some(event) = retest(candle, i, b, cfg.retest_tolerance) {
                events.push(event);
                last_breakout = None;
            }
        }
        if breakout_now.is_some() {
            last_breakout = breakout_now;
        }

        if let Some(event) = sweep(candles, i, cfg) {
            events.push(event);
        }

        if let Some(lv) = levels.filter(|lv| lv.date == date) {
            if let Some(event) = level_touch(candle, i, lv, cfg.touch_tolerance) {
                events.push(event);
            }
        }
    }
    events
}

fn beyond(side: Side, close: f64, edge: f64) -> bool {
    match side {
        Side::Long => close > edge,
        Side::Short => close < edge,
    }
}

/// First close beyond the opening range after it has formed.
fn breakout(candles: &[Candle], i: usize, range: &OpeningRange) -> Option<MarketEvent> {
    let candle = &candles[i];
    if candle.timestamp < range.end || candle.trading_date() != range.date {
        return None;
    }
    let prev = i
        .checked_sub(1)
        .map(|j| &candles[j])
        .filter(|p| p.timestamp >= range.end && p.trading_date() == range.date);

    for (side, edge) in [(Side::Long, range.high), (Side::Short, range.low)] {
        let already_out = prev.is_some_and(|p| beyond(side, p.close, edge));
        if beyond(side, candle.close, edge) && !already_out {
            return Some(MarketEvent {
                kind: AlertKind::RangeBreakout,
                symbol: candle.symbol.clone(),
                candle_index: i,
                candle_timestamp: candle.timestamp,
                price: candle.close,
                reference_level: edge,
                level: None,
                direction: Some(side),
                context: DetectionContext::RangeBreakout {
                    range_high: range.high,
                    range_low: range.low,
                    breakout_close: candle.close,
                    volume: candle.volume,
                    candle_timestamp: candle.timestamp,
                },
            });
        }
    }
    None
}

/// Range returns within `tolerance` of the broken edge and closes on the breakout side.
fn retest(candle: &Candle, i: usize, b: Breakout, tolerance: f64) -> Option<MarketEvent> {
    let band = b.edge * tolerance;
    let (returned, extreme) = match b.side {
        Side::Long => (candle.low <= b.edge + band, candle.low),
        Side::Short => (candle.high >= b.edge - band, candle.high),
    };
    if !returned || !beyond(b.side, candle.close, b.edge) {
        return None;
    }
    Some(MarketEvent {
        kind: AlertKind::Retest,
        symbol: candle.symbol.clone(),
        candle_index: i,
        candle_timestamp: candle.timestamp,
        price: candle.close,
        reference_level: b.edge,
        level: None,
        direction: Some(b.side),
        context: DetectionContext::Retest {
            edge: b.edge,
            breakout_timestamp: b.timestamp,
            retest_extreme: extreme,
            volume: candle.volume,
            candle_timestamp: candle.timestamp,
        },
    })
}

/// Sweep of the reference range confirmed by `confirm_candles` closes back inside.
///
/// Fires on the confirming candle `i`; the sweep candle is `i - confirm_candles`.
fn sweep(candles: &[Candle], i: usize, cfg: &DetectionConfig) -> Option<MarketEvent> {
    let n = cfg.sweep.confirm_candles;
    let s = i.checked_sub(n)?;
    let swept = &candles[s];
    let date = swept.trading_date();
    if !cfg.sweep.sweep.contains(swept.timestamp.time())
        || candles[s..=i].iter().any(|c| c.trading_date() != date)
    {
        return None;
    }
    let (ref_high, ref_low) =
        session_extremes(candles, date, cfg.sweep.reference, swept.timestamp)?;
    let prev = s.checked_sub(1).map(|j| &candles[j]).filter(|p| {
        p.trading_date() == date && cfg.sweep.sweep.contains(p.timestamp.time())
    });
    let confirm = &candles[s + 1..=i];

    // Long: traded below the reference low, then closed back above it.
    let long = swept.low < ref_low
        && !prev.is_some_and(|p| p.low < ref_low)
        && confirm.iter().all(|c| c.close > ref_low);
    let short = swept.high > ref_high
        && !prev.is_some_and(|p| p.high > ref_high)
        && confirm.iter().all(|c| c.close < ref_high);

    let (side, reference, extreme) = if long {
        (Side::Long, ref_low, swept.low)
    } else if short {
        (Side::Short, ref_high, swept.high)
    } else {
        return None;
    };

    let candle = &candles[i];
    Some(MarketEvent {
        kind: AlertKind::SessionSweep,
        symbol: candle.symbol.clone(),
        candle_index: i,
        candle_timestamp: candle.timestamp,
        price: candle.close,
        reference_level: reference,
        level: None,
        direction: Some(side),
        context: DetectionContext::SessionSweep {
            reference_level: reference,
            sweep_extreme: extreme,
            sweep_timestamp: swept.timestamp,
            confirm_candles: n,
            candle_timestamp: candle.timestamp,
        },
    })
}

/// Nearest daily level the candle range touches within `tolerance`.
fn level_touch(
    candle: &Candle,
    i: usize,
    levels: &DailyLevels,
    tolerance: f64,
) -> Option<MarketEvent> {
    let (name, level) = levels
        .levels()
        .into_iter()
        .filter(|(_, level)| candle.touches(*level, level * tolerance))
        .min_by(|a, b| (a.1 - candle.close).abs().total_cmp(&(b.1 - candle.close).abs()))?;

    let direction = if candle.close > level {
        Some(Side::Long)
    } else if candle.close < level {
        Some(Side::Short)
    } else {
        None
    };
    let touch_price = match direction {
        Some(Side::Short) => candle.high,
        _ => candle.low,
    };

    Some(MarketEvent {
        kind: AlertKind::LevelTouch,
        symbol: candle.symbol.clone(),
        candle_index: i,
        candle_timestamp: candle.timestamp,
        price: candle.close,
        reference_level: level,
        level: Some(name),
        direction,
        context: DetectionContext::LevelTouch {
            level: name,
            level_price: level,
            touch_price,
            volume: candle.volume,
            candle_timestamp: candle.timestamp,
        },
    })
}

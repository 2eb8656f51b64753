//! Two-candle pattern recognition for the candle-structure score.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    Doji,
    BullishClose,
    BearishClose,
    None,
}

impl CandlePattern {
    /// Structure score of this pattern for a trade on `side`.
    pub fn score(self, side: Side) -> f64 {
        match (self, side) {
            (CandlePattern::BullishEngulfing, Side::Long)
            | (CandlePattern::BearishEngulfing, Side::Short) => 1.0,
            (CandlePattern::Hammer, Side::Long) | (CandlePattern::ShootingStar, Side::Short) => 0.8,
            (CandlePattern::Doji, _) => 0.5,
            (CandlePattern::BullishClose, Side::Long)
            | (CandlePattern::BearishClose, Side::Short) => 0.3,
            _ => 0.0,
        }
    }
}

fn is_bullish_engulfing(prev: &Candle, last: &Candle) -> bool {
    prev.is_bearish() && last.is_bullish() && last.open <= prev.close && last.close >= prev.open
}

fn is_bearish_engulfing(prev: &Candle, last: &Candle) -> bool {
    prev.is_bullish() && last.is_bearish() && last.open >= prev.close && last.close <= prev.open
}

fn is_hammer(c: &Candle) -> bool {
    let range = c.range();
    range > 0.0 && c.lower_wick() >= 2.0 * c.body() && c.upper_wick() <= 0.25 * range
}

fn is_shooting_star(c: &Candle) -> bool {
    let range = c.range();
    range > 0.0 && c.upper_wick() >= 2.0 * c.body() && c.lower_wick() <= 0.25 * range
}

fn is_doji(c: &Candle) -> bool {
    c.body() <= 0.1 * c.range()
}

/// Strongest pattern formed by the last one or two candles, judged for `side`.
///
/// Patterns are tried strongest-first; the first one that is favourable to
/// `side` wins, otherwise the first one found at all.
pub fn detect_pattern(candles: &[Candle], side: Side) -> CandlePattern {
    let Some(last) = candles.last() else {
        return CandlePattern::None;
    };
    let prev = candles.len().checked_sub(2).map(|i| &candles[i]);

    let mut found = Vec::with_capacity(4);
    if let Some(prev) = prev {
        if is_bullish_engulfing(prev, last) {
            found.push(CandlePattern::BullishEngulfing);
        }
        if is_bearish_engulfing(prev, last) {
            found.push(CandlePattern::BearishEngulfing);
        }
    }
    if is_hammer(last) {
        found.push(CandlePattern::Hammer);
    }
    if is_shooting_star(last) {
        found.push(CandlePattern::ShootingStar);
    }
    if is_doji(last) {
        found.push(CandlePattern::Doji);
    }
    if last.is_bullish() {
        found.push(CandlePattern::BullishClose);
    } else if last.is_bearish() {
        found.push(CandlePattern::BearishClose);
    }

    found
        .iter()
        .copied()
        .find(|p| p.score(side) > 0.0)
        .or_else(|| found.first().copied())
        .unwrap_or(CandlePattern::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timeframe;
    use chrono::{TimeZone, Utc};

    fn candle(o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(
            "TEST",
            Timeframe::M5,
            Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap(),
            o,
            h,
            l,
            c,
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn bullish_engulfing() {
        let c = [candle(101.0, 101.5, 99.5, 100.0), candle(99.8, 102.0, 99.7, 101.5)];
        assert_eq!(detect_pattern(&c, Side::Long), CandlePattern::BullishEngulfing);
        assert_eq!(CandlePattern::BullishEngulfing.score(Side::Long), 1.0);
        assert_eq!(CandlePattern::BullishEngulfing.score(Side::Short), 0.0);
    }

    #[test]
    fn hammer_and_shooting_star() {
        let hammer = [candle(100.0, 100.6, 97.0, 100.5)];
        assert_eq!(detect_pattern(&hammer, Side::Long), CandlePattern::Hammer);
        let star = [candle(100.5, 103.5, 99.9, 100.0)];
        assert_eq!(detect_pattern(&star, Side::Short), CandlePattern::ShootingStar);
    }

    #[test]
    fn doji_scores_half_either_way() {
        let doji = [candle(100.0, 101.0, 99.0, 100.05)];
        let p = detect_pattern(&doji, Side::Short);
        assert_eq!(p, CandlePattern::Doji);
        assert_eq!(p.score(Side::Long), 0.5);
    }

    #[test]
    fn plain_directional_close() {
        let c = [candle(100.0, 101.2, 99.8, 101.0)];
        assert_eq!(detect_pattern(&c, Side::Long), CandlePattern::BullishClose);
        assert_eq!(detect_pattern(&c, Side::Long).score(Side::Long), 0.3);
        assert_eq!(detect_pattern(&c, Side::Short).score(Side::Short), 0.0);
    }

    #[test]
    fn empty_input() {
        assert_eq!(detect_pattern(&[], Side::Long), CandlePattern::None);
    }
}

//! Mapping from detected events to candidate setups.
//!
//! | strategy                | event           | entry            | stop beyond          |
//! |-------------------------|-----------------|------------------|----------------------|
//! | opening range breakout  | range breakout  | breakout close   | opposite range edge  |
//! | breakout retest         | retest          | broken edge      | retest extreme       |
//! | session sweep reversal  | session sweep   | confirming close | sweep extreme        |
//! | pivot bounce            | level touch     | touch close      | touch extreme        |
//!
//! Stops are pushed `stop_buffer_pct` further away; the target sits
//! `reward_multiple` risk units beyond entry.

use super::detect::MarketEvent;
use crate::config::{StrategyConfig, StrategyKind};
use crate::domain::{AlertKind, DetectionContext, Side};
use crate::risk::{take_profit, RiskError};
use crate::validation::Candidate;

impl StrategyKind {
    /// Event kind this strategy trades.
    pub fn trigger(self) -> AlertKind {
        match self {
            StrategyKind::OpeningRangeBreakout => AlertKind::RangeBreakout,
            StrategyKind::BreakoutRetest => AlertKind::Retest,
            StrategyKind::SessionSweepReversal => AlertKind::SessionSweep,
            StrategyKind::PivotBounce => AlertKind::LevelTouch,
        }
    }
}

fn push_away(price: f64, side: Side, buffer_pct: f64) -> f64 {
    price * (1.0 - side.sign() * buffer_pct)
}

/// Candidate for `event` under `strategy`, or `None` if the strategy does not
/// trade this event or direction.
pub fn candidate_for(
    strategy: &StrategyConfig,
    event: &MarketEvent,
) -> Result<Option<Candidate>, RiskError> {
    if strategy.kind.trigger() != event.kind {
        return Ok(None);
    }
    let Some(side) = event.direction else {
        return Ok(None);
    };
    if !strategy.allows(side) {
        return Ok(None);
    }

    let worst = |a: f64, b: f64| match side {
        Side::Long => a.min(b),
        Side::Short => a.max(b),
    };

    let (entry, structural_stop) = match &event.context {
        DetectionContext::RangeBreakout {
            range_high,
            range_low,
            breakout_close,
            ..
        } => {
            let opposite = match side {
                Side::Long => *range_low,
                Side::Short => *range_high,
            };
            (*breakout_close, opposite)
        }
        DetectionContext::Retest {
            edge,
            retest_extreme,
            ..
        } => (*edge, worst(*retest_extreme, *edge)),
        DetectionContext::SessionSweep { sweep_extreme, .. } => (event.price, *sweep_extreme),
        DetectionContext::LevelTouch {
            level_price,
            touch_price,
            ..
        } => (event.price, worst(*touch_price, *level_price)),
    };

    let stop_loss = push_away(structural_stop, side, strategy.stop_buffer_pct);
    let take_profit = take_profit(entry, stop_loss, side, strategy.reward_multiple)?;

    Ok(Some(Candidate {
        symbol: event.symbol.clone(),
        strategy: strategy.id.clone(),
        side,
        entry,
        stop_loss,
        take_profit,
    }))
}

//! Setup state machine.
//!
//! ```text
//! Pending ──entry reached──▶ Active ──target──▶ Filled
//!    │                          └────stop────▶ Invalid
//!    └──superseded / expired / risk rejected──▶ Cancelled
//! ```
//!
//! When stop and target fall inside the same candle the stop is assumed to
//! have traded first. Functions here only mutate the setup they are given;
//! the engine decides when to call them and persists the result.

use chrono::{DateTime, Utc};

use crate::domain::{Candle, CloseReason, Setup, SetupStatus, Side};
use crate::risk::{breakeven_check, r_multiple, RiskError};

/// What a candle did to an active setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveOutcome {
    Open,
    BreakevenMoved,
    Filled,
    StoppedOut,
}

/// Candle reaches the entry within `tolerance` and closes on the trade side of it.
pub fn entry_triggered(setup: &Setup, candle: &Candle, tolerance: f64) -> bool {
    let band = setup.entry * tolerance;
    if !candle.touches(setup.entry, band) {
        return false;
    }
    match setup.side {
        Side::Long => candle.close >= setup.entry - band,
        Side::Short => candle.close <= setup.entry + band,
    }
}

pub fn is_expired(setup: &Setup, at: DateTime<Utc>) -> bool {
    setup.status == SetupStatus::Pending && at > setup.expires_at
}

fn stop_touched(setup: &Setup, candle: &Candle) -> bool {
    match setup.side {
        Side::Long => candle.low <= setup.stop_loss,
        Side::Short => candle.high >= setup.stop_loss,
    }
}

fn target_touched(setup: &Setup, candle: &Candle) -> bool {
    match setup.side {
        Side::Long => candle.high >= setup.take_profit,
        Side::Short => candle.low <= setup.take_profit,
    }
}

pub fn activate(setup: &mut Setup, at: DateTime<Utc>) {
    setup.status = SetupStatus::Active;
    setup.activated_at = Some(at);
}

pub fn cancel(setup: &mut Setup, reason: CloseReason, at: DateTime<Utc>) {
    setup.status = SetupStatus::Cancelled;
    setup.close_reason = Some(reason);
    setup.closed_at = Some(at);
}

fn close(
    setup: &mut Setup,
    status: SetupStatus,
    reason: CloseReason,
    price: f64,
    at: DateTime<Utc>,
) -> Result<(), RiskError> {
    setup.realized_r = Some(r_multiple(setup.entry, setup.initial_stop, price, setup.side)?);
    setup.status = status;
    setup.close_reason = Some(reason);
    setup.exit_price = Some(price);
    setup.closed_at = Some(at);
    Ok(())
}

/// Close at the stop if `candle` reaches it. Used on the activation candle,
/// where only the adverse side can be trusted.
pub fn stop_out_if_touched(setup: &mut Setup, candle: &Candle) -> Result<bool, RiskError> {
    if setup.status != SetupStatus::Active || !stop_touched(setup, candle) {
        return Ok(false);
    }
    let reason = if setup.breakeven_moved {
        CloseReason::BreakevenStop
    } else {
        CloseReason::StopHit
    };
    close(setup, SetupStatus::Invalid, reason, setup.stop_loss, candle.timestamp)?;
    Ok(true)
}

/// Apply one candle to an active setup.
pub fn advance_active(
    setup: &mut Setup,
    candle: &Candle,
    breakeven_threshold_r: f64,
) -> Result<ActiveOutcome, RiskError> {
    if setup.status != SetupStatus::Active {
        return Ok(ActiveOutcome::Open);
    }
    if stop_out_if_touched(setup, candle)? {
        return Ok(ActiveOutcome::StoppedOut);
    }
    if target_touched(setup, candle) {
        close(
            setup,
            SetupStatus::Filled,
            CloseReason::TargetHit,
            setup.take_profit,
            candle.timestamp,
        )?;
        return Ok(ActiveOutcome::Filled);
    }
    if !setup.breakeven_moved {
        let decision = breakeven_check(
            setup.entry,
            setup.initial_stop,
            candle.close,
            setup.side,
            breakeven_threshold_r,
        )?;
        if decision.should_move {
            setup.stop_loss = decision.new_stop;
            setup.breakeven_moved = true;
            return Ok(ActiveOutcome::BreakevenMoved);
        }
    }
    Ok(ActiveOutcome::Open)
}

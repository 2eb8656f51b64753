//! Break-even stop move.
//!
//! Once open profit reaches `threshold_r` units of initial risk, the stop moves
//! to entry. The decision is stateless; callers track whether it already happened.

use serde::{Deserialize, Serialize};

use super::{r_multiple, RiskError};
use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakevenDecision {
    pub should_move: bool,
    /// Entry when moving, otherwise the unchanged stop.
    pub new_stop: f64,
    pub r_multiple: f64,
}

pub fn breakeven_check(
    entry: f64,
    stop: f64,
    current: f64,
    side: Side,
    threshold_r: f64,
) -> Result<BreakevenDecision, RiskError> {
    if !threshold_r.is_finite() || threshold_r <= 0.0 {
        return Err(RiskError::InvalidInput(format!(
            "break-even threshold must be positive, got {threshold_r}"
        )));
    }
    let r = r_multiple(entry, stop, current, side)?;
    let should_move = r >= threshold_r;
    Ok(BreakevenDecision {
        should_move,
        new_stop: if should_move { entry } else { stop },
        r_multiple: r,
    })
}

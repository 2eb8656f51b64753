//! Fixed-fractional sizing and stop/target placement.
//!
//! # Formula
//! ```text
//! risk_amount   = balance * risk_fraction
//! position_size = risk_amount / |entry - stop|
//! take_profit   = entry ± multiple * |entry - stop|
//! r_multiple    = (price - entry) * sign / |entry - stop|
//! ```

use super::{check_entry_stop, check_price, RiskError};
use crate::domain::Side;

/// Units such that hitting the stop loses exactly `balance * risk_fraction`.
pub fn position_size(
    balance: f64,
    risk_fraction: f64,
    entry: f64,
    stop: f64,
) -> Result<f64, RiskError> {
    if !balance.is_finite() || balance <= 0.0 {
        return Err(RiskError::InvalidInput(format!(
            "balance must be positive, got {balance}"
        )));
    }
    if !risk_fraction.is_finite() || risk_fraction <= 0.0 || risk_fraction > 1.0 {
        return Err(RiskError::InvalidInput(format!(
            "risk fraction must be in (0, 1], got {risk_fraction}"
        )));
    }
    let distance = check_entry_stop(entry, stop)?;
    Ok(balance * risk_fraction / distance)
}

/// Stop `distance_pct` away from entry, below for longs, above for shorts.
pub fn stop_loss(entry: f64, side: Side, distance_pct: f64) -> Result<f64, RiskError> {
    check_price("entry", entry)?;
    if !distance_pct.is_finite() || distance_pct <= 0.0 || distance_pct >= 1.0 {
        return Err(RiskError::InvalidInput(format!(
            "stop distance must be in (0, 1), got {distance_pct}"
        )));
    }
    Ok(entry * (1.0 - side.sign() * distance_pct))
}

/// Target `multiple` risk units beyond entry.
pub fn take_profit(entry: f64, stop: f64, side: Side, multiple: f64) -> Result<f64, RiskError> {
    let distance = check_entry_stop(entry, stop)?;
    if !multiple.is_finite() || multiple <= 0.0 {
        return Err(RiskError::InvalidInput(format!(
            "reward multiple must be positive, got {multiple}"
        )));
    }
    let target = entry + side.sign() * multiple * distance;
    check_price("take profit", target)?;
    Ok(target)
}

/// Profit at `price` in units of initial risk. Negative when under water.
pub fn r_multiple(entry: f64, stop: f64, price: f64, side: Side) -> Result<f64, RiskError> {
    let distance = check_entry_stop(entry, stop)?;
    Ok((price - entry) * side.sign() / distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn size_risks_exact_fraction() {
        let size = position_size(10_000.0, 0.01, 100.0, 95.0).unwrap();
        assert_approx(size, 20.0, DEFAULT_EPSILON);
        assert_approx(size * 5.0, 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn size_rejects_equal_entry_and_stop() {
        assert!(matches!(
            position_size(10_000.0, 0.01, 100.0, 100.0),
            Err(RiskError::InvalidPrice(_))
        ));
    }

    #[test]
    fn size_rejects_bad_inputs() {
        assert!(matches!(
            position_size(0.0, 0.01, 100.0, 95.0),
            Err(RiskError::InvalidInput(_))
        ));
        assert!(matches!(
            position_size(10_000.0, 1.5, 100.0, 95.0),
            Err(RiskError::InvalidInput(_))
        ));
        assert!(matches!(
            position_size(10_000.0, 0.01, -1.0, 95.0),
            Err(RiskError::InvalidPrice(_))
        ));
    }

    #[test]
    fn stop_side_depends_on_direction() {
        assert_approx(stop_loss(100.0, Side::Long, 0.02).unwrap(), 98.0, 1e-9);
        assert_approx(stop_loss(100.0, Side::Short, 0.02).unwrap(), 102.0, 1e-9);
    }

    #[test]
    fn target_is_multiple_of_risk() {
        assert_approx(take_profit(100.0, 95.0, Side::Long, 2.0).unwrap(), 110.0, 1e-9);
        assert_approx(take_profit(100.0, 105.0, Side::Short, 2.0).unwrap(), 90.0, 1e-9);
    }

    #[test]
    fn short_target_below_zero_is_error() {
        assert!(take_profit(10.0, 20.0, Side::Short, 2.0).is_err());
    }

    #[test]
    fn r_multiple_signs() {
        assert_approx(r_multiple(100.0, 95.0, 110.0, Side::Long).unwrap(), 2.0, 1e-9);
        assert_approx(r_multiple(100.0, 95.0, 95.0, Side::Long).unwrap(), -1.0, 1e-9);
        assert_approx(r_multiple(100.0, 105.0, 95.0, Side::Short).unwrap(), 1.0, 1e-9);
    }
}

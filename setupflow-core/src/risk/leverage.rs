//! Leverage by instrument class.
//!
//! Knock-out products carry their own leverage, fixed by the barrier:
//! ```text
//! barrier  = stop * (1 - buffer)   (long)   |  stop * (1 + buffer)   (short)
//! leverage = entry / |entry - barrier|
//! ```
//! CFD and spot leverage is account leverage: `notional / balance`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{check_entry_stop, RiskError};
use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    Spot,
    Cfd,
    KnockOut,
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstrumentClass::Spot => "spot",
            InstrumentClass::Cfd => "cfd",
            InstrumentClass::KnockOut => "knock_out",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for InstrumentClass {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "spot" => Ok(InstrumentClass::Spot),
            "cfd" => Ok(InstrumentClass::Cfd),
            "knock_out" | "knockout" | "ko" => Ok(InstrumentClass::KnockOut),
            other => Err(RiskError::InvalidInput(format!("unknown instrument '{other}'"))),
        }
    }
}

/// Maximum leverage per instrument class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverageCaps {
    pub spot: f64,
    pub cfd: f64,
    pub knock_out: f64,
}

impl Default for LeverageCaps {
    fn default() -> Self {
        Self {
            spot: 1.0,
            cfd: 30.0,
            knock_out: 10.0,
        }
    }
}

impl LeverageCaps {
    pub fn cap(&self, instrument: InstrumentClass) -> f64 {
        match instrument {
            InstrumentClass::Spot => self.spot,
            InstrumentClass::Cfd => self.cfd,
            InstrumentClass::KnockOut => self.knock_out,
        }
    }
}

/// Barrier placed `buffer_pct` beyond the stop so the stop triggers first.
pub fn knockout_barrier(stop: f64, side: Side, buffer_pct: f64) -> f64 {
    stop * (1.0 - side.sign() * buffer_pct)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageAssessment {
    pub instrument: InstrumentClass,
    pub leverage: f64,
    pub cap: f64,
    pub barrier: Option<f64>,
    pub warning: Option<String>,
}

impl LeverageAssessment {
    pub fn exceeds_cap(&self) -> bool {
        self.leverage > self.cap
    }
}

/// Leverage for a sized trade. Exceeding the cap is reported, not rejected.
#[allow(clippy::too_many_arguments)]
pub fn assess_leverage(
    instrument: InstrumentClass,
    side: Side,
    entry: f64,
    stop: f64,
    position_size: f64,
    balance: f64,
    caps: &LeverageCaps,
    knockout_buffer_pct: f64,
) -> Result<LeverageAssessment, RiskError> {
    check_entry_stop(entry, stop)?;
    if !balance.is_finite() || balance <= 0.0 {
        return Err(RiskError::InvalidInput(format!(
            "balance must be positive, got {balance}"
        )));
    }

    let (leverage, barrier) = match instrument {
        InstrumentClass::KnockOut => {
            let barrier = knockout_barrier(stop, side, knockout_buffer_pct);
            let gap = (entry - barrier).abs();
            if gap == 0.0 {
                return Err(RiskError::InvalidPrice(format!(
                    "knock-out barrier equals entry ({entry})"
                )));
            }
            (entry / gap, Some(barrier))
        }
        InstrumentClass::Cfd | InstrumentClass::Spot => {
            (position_size.abs() * entry / balance, None)
        }
    };

    let cap = caps.cap(instrument);
    let warning = (leverage > cap).then(|| {
        format!("{instrument} leverage {leverage:.2}x exceeds cap {cap:.0}x")
    });

    Ok(LeverageAssessment {
        instrument,
        leverage,
        cap,
        barrier,
        warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn knockout_barrier_sits_beyond_stop() {
        assert_approx(knockout_barrier(95.0, Side::Long, 0.005), 94.525, 1e-9);
        assert_approx(knockout_barrier(105.0, Side::Short, 0.005), 105.525, 1e-9);
    }

    #[test]
    fn knockout_leverage_from_barrier() {
        let a = assess_leverage(
            InstrumentClass::KnockOut,
            Side::Long,
            100.0,
            95.0,
            20.0,
            10_000.0,
            &LeverageCaps::default(),
            0.005,
        )
        .unwrap();
        assert_approx(a.leverage, 100.0 / 5.475, 1e-9);
        assert!(!a.exceeds_cap());
        assert!(a.warning.is_none());
    }

    #[test]
    fn tight_knockout_warns_but_returns_value() {
        let a = assess_leverage(
            InstrumentClass::KnockOut,
            Side::Long,
            100.0,
            99.5,
            200.0,
            10_000.0,
            &LeverageCaps::default(),
            0.0,
        )
        .unwrap();
        assert_approx(a.leverage, 200.0, 1e-9);
        assert!(a.exceeds_cap());
        assert!(a.warning.is_some());
    }

    #[test]
    fn cfd_leverage_is_notional_over_balance() {
        let a = assess_leverage(
            InstrumentClass::Cfd,
            Side::Short,
            100.0,
            101.0,
            1_000.0,
            10_000.0,
            &LeverageCaps::default(),
            0.005,
        )
        .unwrap();
        assert_approx(a.leverage, 10.0, 1e-9);
        assert_eq!(a.cap, 30.0);
        assert!(a.barrier.is_none());
    }

    #[test]
    fn spot_cap_is_one() {
        let a = assess_leverage(
            InstrumentClass::Spot,
            Side::Long,
            100.0,
            99.0,
            200.0,
            10_000.0,
            &LeverageCaps::default(),
            0.0,
        )
        .unwrap();
        assert_approx(a.leverage, 2.0, 1e-9);
        assert!(a.exceeds_cap());
    }

    #[test]
    fn instrument_parses() {
        assert_eq!("KO".parse::<InstrumentClass>().unwrap(), InstrumentClass::KnockOut);
        assert_eq!("knock-out".parse::<InstrumentClass>().unwrap(), InstrumentClass::KnockOut);
        assert!("future".parse::<InstrumentClass>().is_err());
    }
}

//! Risk Calculator.
//!
//! Position sizing, stop/target placement, leverage by instrument class,
//! break-even decisions, full trade-risk reports and the portfolio gate that
//! blocks activations. Pure arithmetic: nothing here performs I/O.

pub mod breakeven;
pub mod leverage;
pub mod portfolio;
pub mod sizing;
pub mod trade;

pub use breakeven::{breakeven_check, BreakevenDecision};
pub use leverage::{assess_leverage, knockout_barrier, InstrumentClass, LeverageAssessment, LeverageCaps};
pub use portfolio::{PortfolioRiskSnapshot, RiskLimitExceeded, SymbolExposure};
pub use sizing::{position_size, r_multiple, stop_loss, take_profit};
pub use trade::{validate_trade, TradeRequest, TradeRiskReport};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskError {
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub(crate) fn check_price(name: &str, value: f64) -> Result<(), RiskError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RiskError::InvalidPrice(format!("{name} must be positive, got {value}")));
    }
    Ok(())
}

/// Entry and stop must both be valid and distinct.
pub(crate) fn check_entry_stop(entry: f64, stop: f64) -> Result<f64, RiskError> {
    check_price("entry", entry)?;
    check_price("stop", stop)?;
    let distance = (entry - stop).abs();
    if distance == 0.0 {
        return Err(RiskError::InvalidPrice(format!(
            "entry and stop are equal ({entry})"
        )));
    }
    Ok(distance)
}

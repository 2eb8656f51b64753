//! Full trade-risk report.
//!
//! Errors block the trade; warnings are advisory. Invalid prices are reported
//! as errors in the report rather than returned as `Err`, so callers always get
//! a complete picture of what is wrong.

use serde::{Deserialize, Serialize};

use super::{assess_leverage, position_size, InstrumentClass, RiskError};
use crate::config::RiskConfig;
use crate::domain::Side;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub side: Side,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Instrument override; `RiskConfig::instrument` when absent.
    pub instrument: Option<InstrumentClass>,
    /// Risk fraction override; `RiskConfig::risk_per_trade` when absent.
    pub risk_fraction: Option<f64>,
    /// Non-terminal setups already held on this symbol.
    pub open_on_symbol: usize,
}

impl TradeRequest {
    pub fn new(symbol: &str, side: Side, entry: f64, stop_loss: f64, take_profit: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            entry,
            stop_loss,
            take_profit,
            instrument: None,
            risk_fraction: None,
            open_on_symbol: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeRiskReport {
    pub is_valid: bool,
    pub risk_amount: f64,
    /// Risk as a fraction of balance.
    pub risk_percentage: f64,
    pub position_size: f64,
    pub leverage: f64,
    pub barrier: Option<f64>,
    pub reward_multiple: f64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl TradeRiskReport {
    fn rejected(error: RiskError) -> Self {
        Self {
            errors: vec![error.to_string()],
            ..Self::default()
        }
    }
}

pub fn validate_trade(req: &TradeRequest, cfg: &RiskConfig) -> TradeRiskReport {
    let sign = req.side.sign();
    if (req.entry - req.stop_loss) * sign <= 0.0 {
        return TradeRiskReport::rejected(RiskError::InvalidPrice(format!(
            "{} stop {} is not on the losing side of entry {}",
            req.side, req.stop_loss, req.entry
        )));
    }
    if (req.take_profit - req.entry) * sign <= 0.0 {
        return TradeRiskReport::rejected(RiskError::InvalidPrice(format!(
            "{} target {} is not on the winning side of entry {}",
            req.side, req.take_profit, req.entry
        )));
    }

    let fraction = req.risk_fraction.unwrap_or(cfg.risk_per_trade);
    let size = match position_size(cfg.account_balance, fraction, req.entry, req.stop_loss) {
        Ok(size) => size,
        Err(e) => return TradeRiskReport::rejected(e),
    };
    let instrument = req.instrument.unwrap_or(cfg.instrument);
    let leverage = match assess_leverage(
        instrument,
        req.side,
        req.entry,
        req.stop_loss,
        size,
        cfg.account_balance,
        &cfg.leverage_caps,
        cfg.knockout_buffer_pct,
    ) {
        Ok(a) => a,
        Err(e) => return TradeRiskReport::rejected(e),
    };

    let risk_per_unit = (req.entry - req.stop_loss).abs();
    let risk_amount = size * risk_per_unit;
    let risk_percentage = risk_amount / cfg.account_balance;
    let reward_multiple = (req.take_profit - req.entry).abs() / risk_per_unit;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if risk_percentage > cfg.max_risk_per_trade + 1e-12 {
        errors.push(format!(
            "risk {:.2}% exceeds per-trade cap {:.2}%",
            risk_percentage * 100.0,
            cfg.max_risk_per_trade * 100.0
        ));
    }
    if let Some(w) = &leverage.warning {
        errors.push(w.clone());
    } else if leverage.leverage > leverage.cap * cfg.leverage_warning_ratio {
        warnings.push(format!(
            "leverage {:.2}x is near the {instrument} cap {:.0}x",
            leverage.leverage, leverage.cap
        ));
    }
    if reward_multiple < cfg.min_reward_multiple {
        warnings.push(format!(
            "reward {reward_multiple:.2}R below minimum {:.2}R",
            cfg.min_reward_multiple
        ));
    }
    if risk_per_unit / req.entry < cfg.tight_stop_pct {
        warnings.push(format!(
            "stop distance {:.4}% is very tight",
            risk_per_unit / req.entry * 100.0
        ));
    }
    if req.open_on_symbol >= cfg.concentration_warning {
        warnings.push(format!(
            "{} already has {} open setups",
            req.symbol, req.open_on_symbol
        ));
    }

    TradeRiskReport {
        is_valid: errors.is_empty(),
        risk_amount,
        risk_percentage,
        position_size: size,
        leverage: leverage.leverage,
        barrier: leverage.barrier,
        reward_multiple,
        warnings,
        errors,
    }
}

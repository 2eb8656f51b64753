//! Portfolio-wide risk aggregation and the activation gate.
//!
//! A snapshot is derived from the active setups and today's closed setups each
//! time an activation is attempted; it is never updated in place.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::PortfolioLimits;
use crate::domain::{Setup, SetupStatus};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskLimitExceeded {
    #[error("aggregate risk would reach {projected_pct:.4} of balance (limit {limit_pct:.4})")]
    AggregateRisk { projected_pct: f64, limit_pct: f64 },

    #[error("aggregate leverage would reach {projected:.2}x (limit {limit:.2}x)")]
    AggregateLeverage { projected: f64, limit: f64 },

    #[error("{symbol} would hold {projected} active setups (limit {limit})")]
    SymbolConcentration {
        symbol: String,
        projected: usize,
        limit: usize,
    },

    #[error("{losses} losing trades already closed on {date} (limit {limit})")]
    DailyLossStop {
        date: NaiveDate,
        losses: usize,
        limit: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolExposure {
    pub active: usize,
    pub risk_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRiskSnapshot {
    pub balance: f64,
    pub trading_date: NaiveDate,
    pub total_risk_amount: f64,
    /// Total risk as a fraction of balance.
    pub total_risk_pct: f64,
    pub total_leverage: f64,
    pub per_symbol: BTreeMap<String, SymbolExposure>,
    pub daily_losses: usize,
}

impl PortfolioRiskSnapshot {
    /// Aggregate `active` setups and count losses among `closed` on `trading_date`.
    ///
    /// Setups with the wrong status in either slice are ignored.
    pub fn build(active: &[Setup], closed: &[Setup], balance: f64, trading_date: NaiveDate) -> Self {
        let mut per_symbol: BTreeMap<String, SymbolExposure> = BTreeMap::new();
        let mut total_risk_amount = 0.0;
        let mut total_leverage = 0.0;

        for s in active.iter().filter(|s| s.status == SetupStatus::Active) {
            total_risk_amount += s.risk_amount;
            total_leverage += s.leverage;
            let exposure = per_symbol.entry(s.symbol.clone()).or_default();
            exposure.active += 1;
            exposure.risk_amount += s.risk_amount;
        }

        let daily_losses = closed
            .iter()
            .filter(|s| s.is_loss() && s.closed_on() == Some(trading_date))
            .count();

        let total_risk_pct = if balance > 0.0 {
            total_risk_amount / balance
        } else {
            f64::INFINITY
        };

        Self {
            balance,
            trading_date,
            total_risk_amount,
            total_risk_pct,
            total_leverage,
            per_symbol,
            daily_losses,
        }
    }

    pub fn active_on(&self, symbol: &str) -> usize {
        self.per_symbol.get(symbol).map_or(0, |e| e.active)
    }

    /// Check whether activating `candidate` keeps every limit.
    pub fn check_activation(
        &self,
        candidate: &Setup,
        limits: &PortfolioLimits,
    ) -> Result<(), RiskLimitExceeded> {
        if self.daily_losses >= limits.max_daily_losses {
            return Err(RiskLimitExceeded::DailyLossStop {
                date: self.trading_date,
                losses: self.daily_losses,
                limit: limits.max_daily_losses,
            });
        }

        let projected = self.active_on(&candidate.symbol) + 1;
        if projected > limits.max_setups_per_symbol {
            return Err(RiskLimitExceeded::SymbolConcentration {
                symbol: candidate.symbol.clone(),
                projected,
                limit: limits.max_setups_per_symbol,
            });
        }

        let projected_pct = (self.total_risk_amount + candidate.risk_amount) / self.balance;
        if !(projected_pct <= limits.max_total_risk_pct + 1e-12) {
            return Err(RiskLimitExceeded::AggregateRisk {
                projected_pct,
                limit_pct: limits.max_total_risk_pct,
            });
        }

        let projected = self.total_leverage + candidate.leverage;
        if projected > limits.max_total_leverage + 1e-12 {
            return Err(RiskLimitExceeded::AggregateLeverage {
                projected,
                limit: limits.max_total_leverage,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::setup::fixtures::{pending_long, ts};
    use crate::domain::Priority;

    fn active(symbol: &str, risk: f64, leverage: f64) -> Setup {
        let mut s = pending_long(symbol, "orb", Priority::Primary);
        s.status = SetupStatus::Active;
        s.risk_amount = risk;
        s.leverage = leverage;
        s
    }

    fn loss() -> Setup {
        let mut s = pending_long("DAX", "orb", Priority::Primary);
        s.status = SetupStatus::Invalid;
        s.realized_r = Some(-1.0);
        s.closed_at = Some(ts(11, 0));
        s
    }

    fn date() -> NaiveDate {
        ts(0, 0).date_naive()
    }

    #[test]
    fn snapshot_aggregates_active_only() {
        let mut pending = active("DAX", 100.0, 1.0);
        pending.status = SetupStatus::Pending;
        let snap = PortfolioRiskSnapshot::build(
            &[active("DAX", 100.0, 1.0), active("NDX", 50.0, 2.0), pending],
            &[],
            10_000.0,
            date(),
        );
        assert_eq!(snap.total_risk_amount, 150.0);
        assert_eq!(snap.total_risk_pct, 0.015);
        assert_eq!(snap.total_leverage, 3.0);
        assert_eq!(snap.active_on("DAX"), 1);
        assert_eq!(snap.active_on("SPX"), 0);
    }

    #[test]
    fn breakeven_close_does_not_count_as_loss() {
        let mut be = loss();
        be.realized_r = Some(0.0);
        let snap = PortfolioRiskSnapshot::build(&[], &[loss(), be], 10_000.0, date());
        assert_eq!(snap.daily_losses, 1);
    }

    #[test]
    fn losses_from_other_days_ignored() {
        let mut old = loss();
        old.closed_at = Some(ts(11, 0) - chrono::Duration::days(1));
        let snap = PortfolioRiskSnapshot::build(&[], &[old], 10_000.0, date());
        assert_eq!(snap.daily_losses, 0);
    }

    #[test]
    fn daily_loss_stop_blocks() {
        let snap = PortfolioRiskSnapshot::build(&[], &[loss(), loss(), loss()], 10_000.0, date());
        let err = snap
            .check_activation(&active("NDX", 10.0, 0.1), &PortfolioLimits::default())
            .unwrap_err();
        assert!(matches!(err, RiskLimitExceeded::DailyLossStop { losses: 3, .. }));
    }

    #[test]
    fn fourth_setup_on_symbol_blocked() {
        let held: Vec<Setup> = (0..3).map(|_| active("DAX", 10.0, 0.1)).collect();
        let snap = PortfolioRiskSnapshot::build(&held, &[], 10_000.0, date());
        assert!(matches!(
            snap.check_activation(&active("DAX", 10.0, 0.1), &PortfolioLimits::default()),
            Err(RiskLimitExceeded::SymbolConcentration { projected: 4, .. })
        ));
        assert!(snap
            .check_activation(&active("NDX", 10.0, 0.1), &PortfolioLimits::default())
            .is_ok());
    }

    #[test]
    fn aggregate_risk_blocks_above_five_percent() {
        let snap = PortfolioRiskSnapshot::build(
            &[active("DAX", 200.0, 1.0), active("NDX", 200.0, 1.0)],
            &[],
            10_000.0,
            date(),
        );
        let limits = PortfolioLimits::default();
        assert!(snap.check_activation(&active("SPX", 100.0, 1.0), &limits).is_ok());
        assert!(matches!(
            snap.check_activation(&active("SPX", 150.0, 1.0), &limits),
            Err(RiskLimitExceeded::AggregateRisk { .. })
        ));
    }

    #[test]
    fn aggregate_leverage_blocks_above_ten() {
        let snap = PortfolioRiskSnapshot::build(&[active("DAX", 10.0, 8.0)], &[], 10_000.0, date());
        assert!(matches!(
            snap.check_activation(&active("NDX", 10.0, 2.5), &PortfolioLimits::default()),
            Err(RiskLimitExceeded::AggregateLeverage { .. })
        ));
    }
}

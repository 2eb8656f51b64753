//! Weighted confidence and the pass/fail decision.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{scores, Metric};
use crate::config::{ScoreWeights, ValidationConfig};
use crate::domain::{Candle, DailyLevels, Side, StrategyId};
use crate::indicators::IndicatorSnapshot;

/// A proposed trade before it is sized and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub strategy: StrategyId,
    pub side: Side,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub confidence: f64,
    pub is_valid: bool,
    pub threshold: f64,
    pub breakdown: BTreeMap<Metric, f64>,
}

impl ValidationResult {
    /// Describe a failed validation; `None` when the candidate passed.
    pub fn rejection(&self, candidate: &Candidate) -> Option<ValidationRejected> {
        if self.is_valid {
            return None;
        }
        let weakest = self
            .breakdown
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(m, _)| *m)
            .unwrap_or(Metric::EmaAlignment);
        Some(ValidationRejected {
            symbol: candidate.symbol.clone(),
            strategy: candidate.strategy.clone(),
            side: candidate.side,
            confidence: self.confidence,
            threshold: self.threshold,
            weakest,
        })
    }
}

/// Below-threshold outcome, kept for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRejected {
    pub symbol: String,
    pub strategy: StrategyId,
    pub side: Side,
    pub confidence: f64,
    pub threshold: f64,
    pub weakest: Metric,
}

fn weight(weights: &ScoreWeights, metric: Metric) -> f64 {
    match metric {
        Metric::EmaAlignment => weights.ema_alignment,
        Metric::PivotConfluence => weights.pivot_confluence,
        Metric::VolumeConfirmation => weights.volume_confirmation,
        Metric::CandleStructure => weights.candle_structure,
        Metric::ContextFlow => weights.context_flow,
    }
}

/// Weighted sum of sub-scores, clamped to [0, 1]. Missing metrics count as 0.
pub fn combine(weights: &ScoreWeights, breakdown: &BTreeMap<Metric, f64>) -> f64 {
    Metric::ALL
        .iter()
        .map(|m| weight(weights, *m) * breakdown.get(m).copied().unwrap_or(0.0).clamp(0.0, 1.0))
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    config: ValidationConfig,
}

impl ValidationEngine {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Score `candidate` against indicators computed up to the triggering candle.
    ///
    /// `recent` must end at the triggering candle; only its last two candles
    /// feed the structure score.
    pub fn validate(
        &self,
        candidate: &Candidate,
        snapshot: &IndicatorSnapshot,
        levels: Option<&DailyLevels>,
        recent: &[Candle],
        threshold: f64,
    ) -> ValidationResult {
        let side = candidate.side;
        let mut breakdown = BTreeMap::new();
        breakdown.insert(Metric::EmaAlignment, scores::ema_alignment(side, snapshot));
        breakdown.insert(
            Metric::PivotConfluence,
            scores::pivot_confluence(candidate.entry, levels, self.config.confluence_band_pct),
        );
        breakdown.insert(
            Metric::VolumeConfirmation,
            scores::volume_confirmation(snapshot.volume, snapshot.avg_volume),
        );
        breakdown.insert(Metric::CandleStructure, scores::candle_structure(side, recent));
        breakdown.insert(
            Metric::ContextFlow,
            scores::context_flow(side, snapshot, &self.config),
        );

        let confidence = combine(&self.config.weights, &breakdown);
        let is_valid = confidence >= threshold;
        debug!(
            symbol = %candidate.symbol,
            strategy = %candidate.strategy,
            side = %side,
            confidence,
            threshold,
            is_valid,
            "candidate scored"
        );

        ValidationResult {
            confidence,
            is_valid,
            threshold,
            breakdown,
        }
    }
}

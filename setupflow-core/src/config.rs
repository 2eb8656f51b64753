//! Engine configuration.
//!
//! Every tunable has a serde default, so an empty TOML document is a valid
//! configuration. [`EngineConfig::validate`] runs once at load; after that the
//! config and the [`StrategyBook`] built from it are read-only.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::domain::{Priority, Side, StrategyId};
use crate::risk::{InstrumentClass, LeverageCaps};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("score weights must sum to 1.0, got {0}")]
    WeightsDoNotSumToOne(f64),

    #[error("duplicate strategy id '{0}'")]
    DuplicateStrategy(StrategyId),
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

fn check_fraction(field: &str, value: f64, allow_zero: bool) -> Result<(), ConfigError> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !value.is_finite() || !lower_ok || value > 1.0 {
        return Err(invalid(field, format!("{value} is not a fraction in (0, 1]")));
    }
    Ok(())
}

fn check_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, format!("{value} must be positive")));
    }
    Ok(())
}

// ── Indicators ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ema_short: usize,
    pub ema_medium: usize,
    pub ema_long: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub atr_period: usize,
    pub volume_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_short: 9,
            ema_medium: 21,
            ema_long: 50,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
            atr_period: 14,
            volume_period: 20,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("indicators.ema_short", self.ema_short),
            ("indicators.ema_medium", self.ema_medium),
            ("indicators.ema_long", self.ema_long),
            ("indicators.rsi_period", self.rsi_period),
            ("indicators.macd_fast", self.macd_fast),
            ("indicators.macd_slow", self.macd_slow),
            ("indicators.macd_signal", self.macd_signal),
            ("indicators.bollinger_period", self.bollinger_period),
            ("indicators.atr_period", self.atr_period),
            ("indicators.volume_period", self.volume_period),
        ];
        for (field, period) in periods {
            if period == 0 {
                return Err(invalid(field, "period must be at least 1"));
            }
        }
        if !(self.ema_short < self.ema_medium && self.ema_medium < self.ema_long) {
            return Err(invalid(
                "indicators.ema_*",
                "periods must satisfy short < medium < long",
            ));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(invalid("indicators.macd_fast", "must be below macd_slow"));
        }
        check_positive("indicators.bollinger_multiplier", self.bollinger_multiplier)
    }
}

// ── Validation ──

/// Sub-score weights. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub ema_alignment: f64,
    pub pivot_confluence: f64,
    pub volume_confirmation: f64,
    pub candle_structure: f64,
    pub context_flow: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            ema_alignment: 0.25,
            pivot_confluence: 0.20,
            volume_confirmation: 0.20,
            candle_structure: 0.20,
            context_flow: 0.15,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.ema_alignment
            + self.pivot_confluence
            + self.volume_confirmation
            + self.candle_structure
            + self.context_flow
    }
}

/// Confidence thresholds outside this band are accepted but logged at load.
pub const RECOMMENDED_THRESHOLDS: RangeInclusive<f64> = 0.70..=0.85;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub weights: ScoreWeights,
    /// Distance to a daily level, as a fraction of price, at which confluence drops to 0.
    pub confluence_band_pct: f64,
    /// Bollinger width below which volatility counts as compressed.
    pub min_band_width: f64,
    /// Bollinger width above which volatility counts as disorderly.
    pub max_band_width: f64,
    /// Threshold for strategies that do not set their own.
    pub default_threshold: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            confluence_band_pct: 0.002,
            min_band_width: 0.002,
            max_band_width: 0.06,
            default_threshold: 0.70,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (field, v) in [
            ("validation.weights.ema_alignment", w.ema_alignment),
            ("validation.weights.pivot_confluence", w.pivot_confluence),
            ("validation.weights.volume_confirmation", w.volume_confirmation),
            ("validation.weights.candle_structure", w.candle_structure),
            ("validation.weights.context_flow", w.context_flow),
        ] {
            check_fraction(field, v, true)?;
        }
        let sum = w.sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::WeightsDoNotSumToOne(sum));
        }
        check_positive("validation.confluence_band_pct", self.confluence_band_pct)?;
        check_positive("validation.min_band_width", self.min_band_width)?;
        if self.max_band_width <= self.min_band_width {
            return Err(invalid(
                "validation.max_band_width",
                "must exceed min_band_width",
            ));
        }
        check_fraction("validation.default_threshold", self.default_threshold, true)
    }
}

// ── Risk ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub account_balance: f64,
    /// Fraction of balance risked per setup.
    pub risk_per_trade: f64,
    /// Hard cap on the per-trade risk fraction.
    pub max_risk_per_trade: f64,
    pub instrument: InstrumentClass,
    pub leverage_caps: LeverageCaps,
    /// Knock-out barrier distance beyond the stop, as a fraction of the stop.
    pub knockout_buffer_pct: f64,
    /// Profit in R at which the stop moves to entry.
    pub breakeven_threshold_r: f64,
    /// Reward multiples below this produce a warning.
    pub min_reward_multiple: f64,
    /// Stops closer than this fraction of entry produce a warning.
    pub tight_stop_pct: f64,
    /// Leverage above this share of the cap produces a warning.
    pub leverage_warning_ratio: f64,
    /// Open setups on one symbol above which a concentration warning is raised.
    pub concentration_warning: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_balance: 10_000.0,
            risk_per_trade: 0.01,
            max_risk_per_trade: 0.02,
            instrument: InstrumentClass::Cfd,
            leverage_caps: LeverageCaps::default(),
            knockout_buffer_pct: 0.005,
            breakeven_threshold_r: 0.5,
            min_reward_multiple: 1.5,
            tight_stop_pct: 0.001,
            leverage_warning_ratio: 0.8,
            concentration_warning: 2,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("risk.account_balance", self.account_balance)?;
        check_fraction("risk.risk_per_trade", self.risk_per_trade, false)?;
        check_fraction("risk.max_risk_per_trade", self.max_risk_per_trade, false)?;
        if self.risk_per_trade > self.max_risk_per_trade {
            return Err(invalid(
                "risk.risk_per_trade",
                "exceeds max_risk_per_trade",
            ));
        }
        check_positive("risk.leverage_caps.spot", self.leverage_caps.spot)?;
        check_positive("risk.leverage_caps.cfd", self.leverage_caps.cfd)?;
        check_positive("risk.leverage_caps.knock_out", self.leverage_caps.knock_out)?;
        check_fraction("risk.knockout_buffer_pct", self.knockout_buffer_pct, true)?;
        check_positive("risk.breakeven_threshold_r", self.breakeven_threshold_r)?;
        check_positive("risk.min_reward_multiple", self.min_reward_multiple)?;
        check_fraction("risk.tight_stop_pct", self.tight_stop_pct, true)?;
        check_fraction("risk.leverage_warning_ratio", self.leverage_warning_ratio, false)
    }
}

/// Hard portfolio limits checked before any activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioLimits {
    pub max_total_risk_pct: f64,
    pub max_total_leverage: f64,
    pub max_setups_per_symbol: usize,
    pub max_daily_losses: usize,
}

impl Default for PortfolioLimits {
    fn default() -> Self {
        Self {
            max_total_risk_pct: 0.05,
            max_total_leverage: 10.0,
            max_setups_per_symbol: 3,
            max_daily_losses: 3,
        }
    }
}

impl PortfolioLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("portfolio.max_total_risk_pct", self.max_total_risk_pct, false)?;
        check_positive("portfolio.max_total_leverage", self.max_total_leverage)?;
        if self.max_setups_per_symbol == 0 {
            return Err(invalid("portfolio.max_setups_per_symbol", "must be at least 1"));
        }
        Ok(())
    }
}

// ── Detection ──

/// UTC time-of-day window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        t >= self.start && t < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningRangeConfig {
    pub session_open: NaiveTime,
    pub minutes: u32,
}

impl Default for OpeningRangeConfig {
    fn default() -> Self {
        Self {
            session_open: hm(8, 0),
            minutes: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Session whose high/low is the sweep reference.
    pub reference: SessionWindow,
    /// Window in which a sweep of the reference is looked for.
    pub sweep: SessionWindow,
    /// Consecutive closes back inside the reference range needed to confirm.
    pub confirm_candles: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            reference: SessionWindow::new(hm(0, 0), hm(7, 0)),
            sweep: SessionWindow::new(hm(7, 0), hm(11, 0)),
            confirm_candles: 3,
        }
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Level-touch band, as a fraction of the level.
    pub touch_tolerance: f64,
    /// Retest band around the broken edge, as a fraction of the edge.
    pub retest_tolerance: f64,
    /// Entry activation band, as a fraction of the entry.
    pub entry_tolerance: f64,
    /// Same-key alerts closer than this in candle time are suppressed.
    pub alert_cooldown_minutes: i64,
    /// Pending setups older than this are cancelled.
    pub setup_expiry_minutes: i64,
    pub opening_range: OpeningRangeConfig,
    pub sweep: SweepConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            touch_tolerance: 0.0005,
            retest_tolerance: 0.001,
            entry_tolerance: 0.0005,
            alert_cooldown_minutes: 30,
            setup_expiry_minutes: 240,
            opening_range: OpeningRangeConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("detection.touch_tolerance", self.touch_tolerance, true)?;
        check_fraction("detection.retest_tolerance", self.retest_tolerance, true)?;
        check_fraction("detection.entry_tolerance", self.entry_tolerance, true)?;
        if self.alert_cooldown_minutes < 0 {
            return Err(invalid("detection.alert_cooldown_minutes", "must not be negative"));
        }
        if self.setup_expiry_minutes <= 0 {
            return Err(invalid("detection.setup_expiry_minutes", "must be positive"));
        }
        if self.opening_range.minutes == 0 {
            return Err(invalid("detection.opening_range.minutes", "must be positive"));
        }
        if self.sweep.confirm_candles == 0 {
            return Err(invalid("detection.sweep.confirm_candles", "must be at least 1"));
        }
        for (field, w) in [
            ("detection.sweep.reference", self.sweep.reference),
            ("detection.sweep.sweep", self.sweep.sweep),
        ] {
            if w.start >= w.end {
                return Err(invalid(field, "start must precede end"));
            }
        }
        Ok(())
    }
}

// ── Strategies ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    OpeningRangeBreakout,
    BreakoutRetest,
    SessionSweepReversal,
    PivotBounce,
}

/// One configured strategy: which events it trades and how it shapes the setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub id: StrategyId,
    pub kind: StrategyKind,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    /// Restrict to one side; both sides when absent.
    #[serde(default)]
    pub direction: Option<Side>,
    /// Confidence threshold; falls back to `validation.default_threshold`.
    #[serde(default)]
    pub min_confidence: Option<f64>,
    #[serde(default = "default_reward_multiple")]
    pub reward_multiple: f64,
    /// Stop distance beyond the structural level, as a fraction of price.
    #[serde(default = "default_stop_buffer_pct")]
    pub stop_buffer_pct: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_priority() -> Priority {
    Priority::Secondary
}

const fn default_reward_multiple() -> f64 {
    2.0
}

const fn default_stop_buffer_pct() -> f64 {
    0.001
}

const fn default_enabled() -> bool {
    true
}

impl StrategyConfig {
    pub fn new(id: &str, kind: StrategyKind, priority: Priority) -> Self {
        Self {
            id: StrategyId::new(id),
            kind,
            priority,
            direction: None,
            min_confidence: None,
            reward_multiple: default_reward_multiple(),
            stop_buffer_pct: default_stop_buffer_pct(),
            enabled: default_enabled(),
        }
    }

    pub fn allows(&self, side: Side) -> bool {
        self.direction.map_or(true, |d| d == side)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = format!("strategies.{}", self.id);
        if self.id.as_str().is_empty() {
            return Err(invalid("strategies.id", "must not be empty"));
        }
        if let Some(t) = self.min_confidence {
            check_fraction(&format!("{prefix}.min_confidence"), t, true)?;
        }
        check_positive(&format!("{prefix}.reward_multiple"), self.reward_multiple)?;
        check_fraction(&format!("{prefix}.stop_buffer_pct"), self.stop_buffer_pct, true)
    }
}

fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::new("orb", StrategyKind::OpeningRangeBreakout, Priority::Primary),
        StrategyConfig::new("retest", StrategyKind::BreakoutRetest, Priority::Primary),
        StrategyConfig::new("sweep", StrategyKind::SessionSweepReversal, Priority::Secondary),
        StrategyConfig::new("pivot_bounce", StrategyKind::PivotBounce, Priority::Secondary),
    ]
}

/// Read-only set of strategies keyed by id.
#[derive(Debug, Clone, Default)]
pub struct StrategyBook {
    strategies: BTreeMap<StrategyId, StrategyConfig>,
}

impl StrategyBook {
    pub fn new(configs: &[StrategyConfig]) -> Result<Self, ConfigError> {
        let mut strategies = BTreeMap::new();
        for cfg in configs {
            cfg.validate()?;
            if strategies.insert(cfg.id.clone(), cfg.clone()).is_some() {
                return Err(ConfigError::DuplicateStrategy(cfg.id.clone()));
            }
        }
        Ok(Self { strategies })
    }

    pub fn get(&self, id: &StrategyId) -> Option<&StrategyConfig> {
        self.strategies.get(id)
    }

    /// Enabled strategies in id order.
    pub fn enabled(&self) -> impl Iterator<Item = &StrategyConfig> {
        self.strategies.values().filter(|s| s.enabled)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

// ── Engine ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub indicators: IndicatorConfig,
    pub validation: ValidationConfig,
    pub risk: RiskConfig,
    pub portfolio: PortfolioLimits,
    pub detection: DetectionConfig,
    pub strategies: Vec<StrategyConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorConfig::default(),
            validation: ValidationConfig::default(),
            risk: RiskConfig::default(),
            portfolio: PortfolioLimits::default(),
            detection: DetectionConfig::default(),
            strategies: default_strategies(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.indicators.validate()?;
        self.validation.validate()?;
        self.risk.validate()?;
        self.portfolio.validate()?;
        self.detection.validate()?;
        StrategyBook::new(&self.strategies)?;
        for w in self.threshold_warnings() {
            warn!(warning = %w, "confidence threshold outside recommended range");
        }
        Ok(())
    }

    /// Effective thresholds that fall outside [`RECOMMENDED_THRESHOLDS`].
    pub fn threshold_warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        let range = RECOMMENDED_THRESHOLDS;
        let t = self.validation.default_threshold;
        if !range.contains(&t) {
            out.push(format!(
                "validation.default_threshold = {t} (recommended {:.2}..={:.2})",
                range.start(),
                range.end()
            ));
        }
        for s in self.strategies.iter().filter(|s| s.enabled) {
            if let Some(t) = s.min_confidence.filter(|t| !range.contains(t)) {
                out.push(format!(
                    "strategies.{}.min_confidence = {t} (recommended {:.2}..={:.2})",
                    s.id,
                    range.start(),
                    range.end()
                ));
            }
        }
        out
    }

    pub fn strategy_book(&self) -> Result<StrategyBook, ConfigError> {
        StrategyBook::new(&self.strategies)
    }

    /// Confidence threshold for `strategy`.
    pub fn threshold_for(&self, strategy: &StrategyConfig) -> f64 {
        strategy
            .min_confidence
            .unwrap_or(self.validation.default_threshold)
    }
}

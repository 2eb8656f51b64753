//! Symbol pass: advance setups, detect events, create setups.
//!
//! Candles are replayed oldest first. For each candle the engine
//! 1. advances every open setup that has not yet seen it (activation passes the
//!    portfolio gate first),
//! 2. maps the events detected on it to candidates, validates, sizes and
//!    stores new setups,
//! 3. turns the events into alerts, deduplicated and notified, each linked to
//!    the setup created from the same event.
//!
//! Activation holds the engine's activation guard from the portfolio read to
//! the store write, so symbols evaluated in parallel see each other's
//! activations and the hard limits hold across the whole pass.
//!
//! Everything keyed by natural-key ids, and every setup remembers the last
//! candle it evaluated, so a pass over candles already seen changes nothing.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info, info_span, warn};

use super::dedup::{AlertDeduper, DedupDecision};
use super::detect::{detect_events, MarketEvent};
use super::state::{self, ActiveOutcome};
use super::strategy::candidate_for;
use crate::config::{ConfigError, EngineConfig, StrategyBook, StrategyConfig};
use crate::domain::{
    Alert, Candle, CloseReason, DailyLevels, MarketSnapshot, Setup, SetupId, SetupStatus,
};
use crate::error::EvaluationError;
use crate::indicators::IndicatorSnapshot;
use crate::risk::{validate_trade, PortfolioRiskSnapshot, TradeRequest};
use crate::store::{AlertStore, Notifier, SetupStore, UpsertOutcome};
use crate::validation::{priority, Candidate, ValidationEngine};

/// Candles and levels for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolInput {
    pub symbol: String,
    /// Oldest first.
    pub candles: Vec<Candle>,
    pub levels: Option<DailyLevels>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub candles: usize,
    pub alerts_created: usize,
    pub alerts_suppressed: usize,
    pub setups_created: usize,
    pub candidates_rejected: usize,
    pub setups_activated: usize,
    pub activations_blocked: usize,
    pub setups_filled: usize,
    pub setups_stopped: usize,
    pub setups_cancelled: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassReport {
    pub symbols: Vec<SymbolReport>,
    pub failures: Vec<SymbolFailure>,
}

impl PassReport {
    pub fn record(&mut self, symbol: &str, result: Result<SymbolReport, EvaluationError>) {
        match result {
            Ok(report) => self.symbols.push(report),
            Err(e) => {
                error!(symbol, error = %e, "symbol pass failed");
                self.failures.push(SymbolFailure {
                    symbol: symbol.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    pub fn alerts_created(&self) -> usize {
        self.symbols.iter().map(|s| s.alerts_created).sum()
    }

    pub fn setups_created(&self) -> usize {
        self.symbols.iter().map(|s| s.setups_created).sum()
    }

    pub fn setups_activated(&self) -> usize {
        self.symbols.iter().map(|s| s.setups_activated).sum()
    }
}

/// Working set of setups for one symbol during a pass.
struct Book {
    setups: Vec<Setup>,
    /// Indices whose `last_evaluated` moved without a persisted change.
    dirty: Vec<bool>,
}

impl Book {
    fn new(setups: Vec<Setup>) -> Self {
        let dirty = vec![false; setups.len()];
        Self { setups, dirty }
    }

    fn contains(&self, id: &SetupId) -> bool {
        self.setups.iter().any(|s| &s.id == id)
    }

    fn push(&mut self, setup: Setup) {
        self.setups.push(setup);
        self.dirty.push(false);
    }
}

pub struct LifecycleEngine {
    config: EngineConfig,
    strategies: StrategyBook,
    validator: ValidationEngine,
    /// Held across portfolio snapshot, gate check and activation write.
    activation: Mutex<()>,
}

impl LifecycleEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let strategies = config.strategy_book()?;
        let validator = ValidationEngine::new(config.validation.clone());
        Ok(Self {
            config,
            strategies,
            validator,
            activation: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn strategies(&self) -> &StrategyBook {
        &self.strategies
    }

    /// Evaluate every input in turn. A failing symbol is logged and recorded;
    /// the others still run.
    pub fn run_pass<S>(
        &self,
        inputs: &[SymbolInput],
        store: &S,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
    ) -> PassReport
    where
        S: SetupStore + AlertStore + ?Sized,
    {
        let market = MarketSnapshot::from_series(inputs.iter().map(|i| i.candles.as_slice()));
        let mut report = PassReport::default();
        for input in inputs {
            let result = self.evaluate_symbol(input, &market, store, notifier, now);
            report.record(&input.symbol, result);
        }
        info!(
            symbols = report.symbols.len(),
            failures = report.failures.len(),
            alerts = report.alerts_created(),
            setups = report.setups_created(),
            "pass complete"
        );
        report
    }

    /// One pass over one symbol. Only candles up to the symbol's entry in
    /// `market` are considered.
    pub fn evaluate_symbol<S>(
        &self,
        input: &SymbolInput,
        market: &MarketSnapshot,
        store: &S,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
    ) -> Result<SymbolReport, EvaluationError>
    where
        S: SetupStore + AlertStore + ?Sized,
    {
        let span = info_span!("symbol_pass", symbol = %input.symbol);
        let _guard = span.enter();

        let cutoff = market
            .latest(&input.symbol)
            .map(|c| c.timestamp)
            .ok_or_else(|| EvaluationError::MissingMarketData(input.symbol.clone()))?;
        check_candles(&input.symbol, &input.candles)?;
        let candles: Vec<Candle> = input
            .candles
            .iter()
            .filter(|c| c.timestamp <= cutoff)
            .cloned()
            .collect();

        let mut report = SymbolReport {
            symbol: input.symbol.clone(),
            candles: candles.len(),
            ..SymbolReport::default()
        };
        let Some(first) = candles.first() else {
            return Ok(report);
        };

        let cooldown = Duration::minutes(self.config.detection.alert_cooldown_minutes);
        let existing_alerts = store.alerts_for_symbol(&input.symbol, first.timestamp - cooldown)?;
        let mut deduper = AlertDeduper::new(cooldown, &existing_alerts);

        let mut book = Book::new(
            store
                .setups_for_symbol(&input.symbol)?
                .into_iter()
                .filter(|s| !s.status.is_terminal())
                .collect(),
        );

        let events = detect_events(&candles, input.levels.as_ref(), &self.config.detection);
        let mut by_candle: BTreeMap<usize, Vec<&MarketEvent>> = BTreeMap::new();
        for event in &events {
            by_candle.entry(event.candle_index).or_default().push(event);
        }
        let warmup = IndicatorSnapshot::required_candles(&self.config.indicators);

        for (i, candle) in candles.iter().enumerate() {
            self.advance(&mut book, candle, store, &mut report)?;

            let Some(candle_events) = by_candle.get(&i) else {
                continue;
            };
            for event in candle_events {
                let created = if i + 1 < warmup {
                    debug!(
                        kind = %event.kind,
                        candle = %event.candle_timestamp,
                        "event during indicator warm-up, no setup"
                    );
                    Vec::new()
                } else {
                    self.create_setups(event, &candles[..=i], input, &mut book, store, &mut report)?
                };
                let setup_id = created.into_iter().next();
                self.emit_alert(event, setup_id, &mut deduper, store, notifier, now, &mut report)?;
            }
        }

        for (setup, dirty) in book.setups.iter().zip(&book.dirty) {
            if *dirty {
                store.upsert_setup(setup)?;
            }
        }

        debug!(?report, "symbol pass complete");
        Ok(report)
    }

    /// Apply `candle` to every setup in `book` that has not seen it yet.
    fn advance<S>(
        &self,
        book: &mut Book,
        candle: &Candle,
        store: &S,
        report: &mut SymbolReport,
    ) -> Result<(), EvaluationError>
    where
        S: SetupStore + ?Sized,
    {
        for idx in 0..book.setups.len() {
            let status = book.setups[idx].status;
            if status.is_terminal() || candle.timestamp <= book.setups[idx].last_evaluated {
                continue;
            }

            let mut changed = false;
            match status {
                SetupStatus::Pending => {
                    changed = self.advance_pending(book, idx, candle, store, report)?;
                }
                SetupStatus::Active => {
                    let setup = &mut book.setups[idx];
                    let outcome =
                        state::advance_active(setup, candle, self.config.risk.breakeven_threshold_r)?;
                    match outcome {
                        ActiveOutcome::Open => {}
                        ActiveOutcome::BreakevenMoved => {
                            info!(setup_id = %setup.id, stop = setup.stop_loss, "stop moved to break-even");
                            changed = true;
                        }
                        ActiveOutcome::Filled => {
                            info!(setup_id = %setup.id, r = ?setup.realized_r, "target hit");
                            report.setups_filled += 1;
                            changed = true;
                        }
                        ActiveOutcome::StoppedOut => {
                            info!(setup_id = %setup.id, r = ?setup.realized_r, reason = ?setup.close_reason, "stopped out");
                            report.setups_stopped += 1;
                            changed = true;
                        }
                    }
                }
                _ => {}
            }

            let setup = &mut book.setups[idx];
            setup.last_evaluated = candle.timestamp;
            if changed {
                store.upsert_setup(setup)?;
                book.dirty[idx] = false;
            } else {
                book.dirty[idx] = true;
            }
        }
        Ok(())
    }

    /// Expire, activate or reject a pending setup. Returns true if it changed.
    fn advance_pending<S>(
        &self,
        book: &mut Book,
        idx: usize,
        candle: &Candle,
        store: &S,
        report: &mut SymbolReport,
    ) -> Result<bool, EvaluationError>
    where
        S: SetupStore + ?Sized,
    {
        let setup = &book.setups[idx];
        if state::is_expired(setup, candle.timestamp) {
            let setup = &mut book.setups[idx];
            state::cancel(setup, CloseReason::Expired, candle.timestamp);
            debug!(setup_id = %setup.id, "pending setup expired");
            report.setups_cancelled += 1;
            return Ok(true);
        }
        if !state::entry_triggered(setup, candle, self.config.detection.entry_tolerance) {
            return Ok(false);
        }

        let activation = self.activation.lock();
        let portfolio = PortfolioRiskSnapshot::build(
            &store.setups_with_status(SetupStatus::Active)?,
            &store.setups_with_status(SetupStatus::Invalid)?,
            self.config.risk.account_balance,
            candle.trading_date(),
        );
        if let Err(limit) = portfolio.check_activation(setup, &self.config.portfolio) {
            error!(
                setup_id = %setup.id,
                strategy = %setup.strategy,
                error = %limit,
                "activation blocked by portfolio limit"
            );
            let setup = &mut book.setups[idx];
            state::cancel(
                setup,
                CloseReason::RiskRejected {
                    detail: limit.to_string(),
                },
                candle.timestamp,
            );
            report.activations_blocked += 1;
            report.setups_cancelled += 1;
            return Ok(true);
        }

        let setup = &mut book.setups[idx];
        state::activate(setup, candle.timestamp);
        info!(
            setup_id = %setup.id,
            strategy = %setup.strategy,
            side = %setup.side,
            entry = setup.entry,
            "setup activated"
        );
        report.setups_activated += 1;
        if state::stop_out_if_touched(setup, candle)? {
            info!(setup_id = %setup.id, "stopped out on activation candle");
            report.setups_stopped += 1;
        }
        // Persist before the next activation reads the portfolio.
        setup.last_evaluated = candle.timestamp;
        store.upsert_setup(setup)?;
        drop(activation);

        let activated = book.setups[idx].clone();
        if activated.status != SetupStatus::Active {
            return Ok(true);
        }
        for other in book.setups.iter_mut() {
            if other.status == SetupStatus::Pending
                && other.id != activated.id
                && priority::cancels_on_activation(&activated, other)
            {
                state::cancel(
                    other,
                    CloseReason::Superseded {
                        by: activated.id.clone(),
                    },
                    candle.timestamp,
                );
                info!(setup_id = %other.id, by = %activated.id, "pending setup superseded");
                report.setups_cancelled += 1;
                store.upsert_setup(other)?;
            }
        }
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_alert<S>(
        &self,
        event: &MarketEvent,
        setup_id: Option<SetupId>,
        deduper: &mut AlertDeduper,
        store: &S,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
        report: &mut SymbolReport,
    ) -> Result<(), EvaluationError>
    where
        S: AlertStore + ?Sized,
    {
        let alert = Alert::new(
            &event.symbol,
            event.kind,
            event.price,
            event.reference_level,
            event.level,
            event.direction,
            event.candle_timestamp,
            now,
        )
        .with_setup(setup_id);
        match deduper.check(&alert) {
            DedupDecision::Emit => {}
            DedupDecision::Replay => {
                report.alerts_suppressed += 1;
                return Ok(());
            }
            DedupDecision::Cooldown { previous } => {
                debug!(kind = %alert.kind, %previous, "alert within cooldown");
                report.alerts_suppressed += 1;
                return Ok(());
            }
        }
        deduper.record(&alert);

        if store.alert(&alert.id)?.is_some() {
            report.alerts_suppressed += 1;
            return Ok(());
        }
        if store.upsert_alert(&alert)? != UpsertOutcome::Inserted {
            return Ok(());
        }
        report.alerts_created += 1;

        match notifier.notify(&alert.payload()) {
            Ok(()) => {
                store.mark_delivered(&alert.id)?;
            }
            Err(e) => {
                warn!(alert_id = %alert.id, error = %e, "alert not delivered");
            }
        }
        Ok(())
    }

    fn create_setups<S>(
        &self,
        event: &MarketEvent,
        history: &[Candle],
        input: &SymbolInput,
        book: &mut Book,
        store: &S,
        report: &mut SymbolReport,
    ) -> Result<Vec<SetupId>, EvaluationError>
    where
        S: SetupStore + ?Sized,
    {
        let mut created = Vec::new();
        let mut snapshot = None;
        for strategy in self.strategies.enabled() {
            let candidate = match candidate_for(strategy, event) {
                Ok(Some(c)) => c,
                Ok(None) => continue,
                Err(e) => {
                    warn!(strategy = %strategy.id, error = %e, "candidate rejected");
                    report.candidates_rejected += 1;
                    continue;
                }
            };

            let id = self.setup_id(&candidate, event.candle_timestamp);
            if book.contains(&id) || store.setup(&id)?.is_some() {
                continue;
            }
            if book.setups.iter().any(|s| {
                s.strategy == candidate.strategy && !s.status.is_terminal()
            }) {
                debug!(strategy = %strategy.id, "open setup already exists for strategy");
                continue;
            }

            if snapshot.is_none() {
                snapshot = Some(IndicatorSnapshot::compute(history, &self.config.indicators)?);
            }
            let Some(snap) = snapshot.as_ref() else {
                continue;
            };
            let levels = input
                .levels
                .as_ref()
                .filter(|lv| lv.date == event.candle_timestamp.date_naive());

            let threshold = self.config.threshold_for(strategy);
            let result = self.validator.validate(&candidate, snap, levels, history, threshold);
            if let Some(rejected) = result.rejection(&candidate) {
                info!(
                    strategy = %rejected.strategy,
                    side = %rejected.side,
                    confidence = rejected.confidence,
                    threshold = rejected.threshold,
                    weakest = %rejected.weakest,
                    "candidate below threshold"
                );
                report.candidates_rejected += 1;
                continue;
            }

            let open_on_symbol = book.setups.iter().filter(|s| !s.status.is_terminal()).count();
            let mut request = TradeRequest::new(
                &candidate.symbol,
                candidate.side,
                candidate.entry,
                candidate.stop_loss,
                candidate.take_profit,
            );
            request.open_on_symbol = open_on_symbol;
            let risk = validate_trade(&request, &self.config.risk);
            for w in &risk.warnings {
                warn!(strategy = %strategy.id, warning = %w, "trade risk warning");
            }
            if !risk.is_valid {
                warn!(strategy = %strategy.id, errors = ?risk.errors, "candidate failed risk checks");
                report.candidates_rejected += 1;
                continue;
            }

            let setup = self.build_setup(id, strategy, &candidate, event, &result, &risk, levels);
            match priority::resolve_conflicts(&setup, &book.setups) {
                priority::Resolution::Reject { by } => {
                    info!(strategy = %strategy.id, %by, "outranked by pending setup");
                    report.candidates_rejected += 1;
                    continue;
                }
                priority::Resolution::Accept { cancel } => {
                    for other in book.setups.iter_mut().filter(|s| cancel.contains(&s.id)) {
                        state::cancel(
                            other,
                            CloseReason::Superseded {
                                by: setup.id.clone(),
                            },
                            event.candle_timestamp,
                        );
                        other.last_evaluated = other.last_evaluated.max(event.candle_timestamp);
                        info!(setup_id = %other.id, by = %setup.id, "pending setup superseded");
                        report.setups_cancelled += 1;
                        store.upsert_setup(other)?;
                    }
                }
            }

            store.upsert_setup(&setup)?;
            info!(
                setup_id = %setup.id,
                strategy = %setup.strategy,
                side = %setup.side,
                entry = setup.entry,
                stop = setup.stop_loss,
                target = setup.take_profit,
                confidence = setup.confidence,
                "setup created"
            );
            report.setups_created += 1;
            created.push(setup.id.clone());
            book.push(setup);
        }
        Ok(created)
    }

    /// Id from symbol, strategy and the expiry window the candle falls in.
    fn setup_id(&self, candidate: &Candidate, at: DateTime<Utc>) -> SetupId {
        let window = self.config.detection.setup_expiry_minutes.max(1) * 60;
        let bucket = at.timestamp().div_euclid(window) * window;
        let window_start = DateTime::from_timestamp(bucket, 0).unwrap_or(at);
        SetupId::from_natural_key(&candidate.symbol, &candidate.strategy, window_start)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_setup(
        &self,
        id: SetupId,
        strategy: &StrategyConfig,
        candidate: &Candidate,
        event: &MarketEvent,
        result: &crate::validation::ValidationResult,
        risk: &crate::risk::TradeRiskReport,
        levels: Option<&DailyLevels>,
    ) -> Setup {
        let created = event.candle_timestamp;
        Setup {
            id,
            symbol: candidate.symbol.clone(),
            strategy: candidate.strategy.clone(),
            side: candidate.side,
            priority: strategy.priority,
            entry: candidate.entry,
            stop_loss: candidate.stop_loss,
            initial_stop: candidate.stop_loss,
            take_profit: candidate.take_profit,
            confidence: result.confidence,
            breakdown: result.breakdown.clone(),
            status: SetupStatus::Pending,
            instrument: self.config.risk.instrument,
            position_size: risk.position_size,
            leverage: risk.leverage,
            risk_amount: risk.risk_amount,
            levels_date: levels.map(|lv| lv.date),
            context: event.context.clone(),
            created_at: created,
            expires_at: created + Duration::minutes(self.config.detection.setup_expiry_minutes),
            activated_at: None,
            closed_at: None,
            last_evaluated: created,
            breakeven_moved: false,
            close_reason: None,
            exit_price: None,
            realized_r: None,
        }
    }
}

/// Candles must belong to `symbol`, be valid and strictly ascending in time.
fn check_candles(symbol: &str, candles: &[Candle]) -> Result<(), EvaluationError> {
    let mut prev: Option<DateTime<Utc>> = None;
    for c in candles {
        c.check()?;
        if c.symbol != symbol || prev.is_some_and(|p| c.timestamp <= p) {
            return Err(EvaluationError::UnorderedCandles {
                symbol: symbol.to_string(),
                found: c.symbol.clone(),
                timestamp: c.timestamp,
            });
        }
        prev = Some(c.timestamp);
    }
    Ok(())
}

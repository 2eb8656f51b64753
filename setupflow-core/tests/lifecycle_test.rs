//! End-to-end symbol passes against the in-memory store.
//!
//! The fixture day is flat at 100 from 03:00, forms an opening range of
//! 99.8–100.2 between 08:00 and 08:30, breaks out at 08:30, triggers the entry
//! at 08:35, reaches break-even at 08:40 and the target at 08:45. Other
//! fixture days reuse the same flat morning and vary what happens after it.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

use setupflow_core::config::{StrategyConfig, StrategyKind};
use setupflow_core::domain::{
    Candle, CloseReason, DailyLevels, DetectionContext, LevelName, Priority, Setup, SetupId,
    SetupStatus, Side, StrategyId, Timeframe,
};
use setupflow_core::risk::InstrumentClass;
use setupflow_core::store::CollectingNotifier;
use setupflow_core::{
    AlertStore, EngineConfig, LifecycleEngine, MemoryStore, SetupStore, SymbolInput,
};

// ── Fixtures ─────────────────────────────────────────────────────────

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, h, m, 0).unwrap()
}

fn now() -> DateTime<Utc> {
    at(12, 0)
}

fn candle(symbol: &str, t: DateTime<Utc>, o: f64, h: f64, l: f64, c: f64) -> Candle {
    Candle::new(symbol, Timeframe::M5, t, o, h, l, c, 1_000.0).unwrap()
}

/// Same candle every five minutes in `[from, until)`.
fn flat(symbol: &str, from: DateTime<Utc>, until: DateTime<Utc>, ohlc: [f64; 4]) -> Vec<Candle> {
    let mut candles = Vec::new();
    let mut t = from;
    while t < until {
        candles.push(candle(symbol, t, ohlc[0], ohlc[1], ohlc[2], ohlc[3]));
        t += Duration::minutes(5);
    }
    candles
}

const QUIET: [f64; 4] = [100.0, 100.2, 99.8, 100.0];

fn breakout_day(symbol: &str) -> Vec<Candle> {
    let mut candles = Vec::new();
    let mut t = at(3, 0);
    while t < at(8, 30) {
        candles.push(candle(symbol, t, 100.0, 100.2, 99.8, 100.0));
        t += Duration::minutes(5);
    }
    candles.push(candle(symbol, at(8, 30), 100.0, 101.2, 99.9, 101.0));
    candles.push(candle(symbol, at(8, 35), 101.0, 101.3, 100.95, 101.1));
    candles.push(candle(symbol, at(8, 40), 101.1, 102.0, 101.0, 101.9));
    candles.push(candle(symbol, at(8, 45), 101.9, 103.7, 101.8, 103.5));
    let mut t = at(8, 50);
    while t <= at(10, 0) {
        candles.push(candle(symbol, t, 103.5, 103.6, 103.4, 103.5));
        t += Duration::minutes(5);
    }
    candles
}

fn strategy(id: &str, kind: StrategyKind, priority: Priority) -> StrategyConfig {
    let mut s = StrategyConfig::new(id, kind, priority);
    s.min_confidence = Some(0.0);
    s
}

fn engine_with(strategies: Vec<StrategyConfig>) -> LifecycleEngine {
    let config = EngineConfig {
        strategies,
        ..EngineConfig::default()
    };
    LifecycleEngine::new(config).unwrap()
}

fn engine() -> LifecycleEngine {
    engine_with(vec![strategy("orb", StrategyKind::OpeningRangeBreakout, Priority::Primary)])
}

fn input(symbol: &str) -> SymbolInput {
    SymbolInput {
        symbol: symbol.to_string(),
        candles: breakout_day(symbol),
        levels: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn stored_setup(
    id: &str,
    symbol: &str,
    strategy: &str,
    priority: Priority,
    entry: f64,
    stop: f64,
    target: f64,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
) -> Setup {
    Setup {
        id: SetupId(id.to_string()),
        symbol: symbol.to_string(),
        strategy: StrategyId::new(strategy),
        side: Side::Long,
        priority,
        entry,
        stop_loss: stop,
        initial_stop: stop,
        take_profit: target,
        confidence: 0.7,
        breakdown: BTreeMap::new(),
        status: SetupStatus::Pending,
        instrument: InstrumentClass::Cfd,
        position_size: 10.0,
        leverage: 0.1,
        risk_amount: 10.0,
        levels_date: None,
        context: DetectionContext::LevelTouch {
            level: LevelName::S1,
            level_price: entry,
            touch_price: entry,
            volume: 1_000.0,
            candle_timestamp: created,
        },
        created_at: created,
        expires_at: expires,
        activated_at: None,
        closed_at: None,
        last_evaluated: created,
        breakeven_moved: false,
        close_reason: None,
        exit_price: None,
        realized_r: None,
    }
}

/// Open position far from its stop and target.
fn active_setup(id: &str, symbol: &str, risk_amount: f64, leverage: f64) -> Setup {
    let mut s = stored_setup(id, symbol, id, Priority::Secondary, 100.0, 50.0, 200.0, at(3, 0), at(23, 0));
    s.status = SetupStatus::Active;
    s.activated_at = Some(at(3, 0));
    s.risk_amount = risk_amount;
    s.leverage = leverage;
    s
}

fn only_setup(store: &MemoryStore, symbol: &str, strategy: &str) -> Setup {
    let found: Vec<Setup> = store
        .setups_for_symbol(symbol)
        .unwrap()
        .into_iter()
        .filter(|s| s.strategy.as_str() == strategy)
        .collect();
    assert_eq!(found.len(), 1, "{found:?}");
    found.into_iter().next().unwrap()
}

fn losing_setup(n: usize) -> Setup {
    let mut s = stored_setup(
        &format!("loss-{n}"),
        "NDX",
        "orb",
        Priority::Primary,
        100.0,
        95.0,
        110.0,
        at(3, 0),
        at(7, 0),
    );
    s.status = SetupStatus::Invalid;
    s.activated_at = Some(at(3, 30));
    s.closed_at = Some(at(4, 0 + n as u32));
    s.exit_price = Some(95.0);
    s.realized_r = Some(-1.0);
    s.close_reason = Some(CloseReason::StopHit);
    s
}

// ── 1. Full lifecycle ────────────────────────────────────────────────

#[test]
fn breakout_setup_runs_to_target() {
    let store = MemoryStore::new();
    let notifier = CollectingNotifier::new();
    let report = engine().run_pass(&[input("DAX")], &store, &notifier, now());

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.alerts_created(), 1);
    assert_eq!(report.setups_created(), 1);
    assert_eq!(report.setups_activated(), 1);
    assert_eq!(notifier.len(), 1);

    let alerts = store.alerts_for_symbol("DAX", at(0, 0)).unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].delivered);
    assert_eq!(alerts[0].reference_level, 100.2);
    assert_eq!(alerts[0].detected_at, now());

    let setups = store.all_setups();
    assert_eq!(setups.len(), 1);
    let s = &setups[0];
    assert_eq!(s.status, SetupStatus::Filled);
    assert_eq!(s.side, Side::Long);
    assert_eq!(s.entry, 101.0);
    assert!(s.breakeven_moved);
    assert_eq!(s.activated_at, Some(at(8, 35)));
    assert_eq!(s.closed_at, Some(at(8, 45)));
    assert!((s.realized_r.unwrap() - 2.0).abs() < 1e-9);
    assert_eq!(s.last_evaluated, at(8, 45));
    assert_eq!(s.breakdown.len(), 5);

    // the alert points at the setup built from the same breakout
    assert_eq!(alerts[0].setup_id, Some(s.id.clone()));
    assert_eq!(notifier.payloads()[0].setup_id, Some(s.id.clone()));
}

// ── 2. Idempotent replay ─────────────────────────────────────────────

#[test]
fn rerun_on_same_candles_changes_nothing() {
    let store = MemoryStore::new();
    let notifier = CollectingNotifier::new();
    let engine = engine();
    engine.run_pass(&[input("DAX")], &store, &notifier, now());
    let setups_before = store.all_setups();
    let alerts_before = store.all_alerts();

    let second = engine.run_pass(&[input("DAX")], &store, &notifier, now() + Duration::hours(1));
    assert_eq!(second.alerts_created(), 0);
    assert_eq!(second.setups_created(), 0);
    assert_eq!(notifier.len(), 1);
    assert_eq!(store.all_setups(), setups_before);
    assert_eq!(store.all_alerts(), alerts_before);
}

// ── 3. Daily loss stop ───────────────────────────────────────────────

#[test]
fn three_losses_today_block_activation() {
    let store = MemoryStore::new();
    for n in 0..3 {
        store.upsert_setup(&losing_setup(n)).unwrap();
    }
    let report = engine().run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());

    assert_eq!(report.setups_created(), 1);
    assert_eq!(report.setups_activated(), 0);
    assert_eq!(report.symbols[0].activations_blocked, 1);

    let dax = store.setups_for_symbol("DAX").unwrap();
    assert_eq!(dax.len(), 1);
    assert_eq!(dax[0].status, SetupStatus::Cancelled);
    assert!(dax[0].activated_at.is_none());
    assert!(matches!(
        dax[0].close_reason,
        Some(CloseReason::RiskRejected { .. })
    ));
}

#[test]
fn two_losses_still_allow_activation() {
    let store = MemoryStore::new();
    for n in 0..2 {
        store.upsert_setup(&losing_setup(n)).unwrap();
    }
    let report = engine().run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());
    assert_eq!(report.setups_activated(), 1);
}

// ── 4. Priority override on activation ───────────────────────────────

#[test]
fn primary_activation_cancels_overlapping_secondary() {
    let store = MemoryStore::new();
    let p1 = stored_setup("p1", "DAX", "orb", Priority::Primary, 101.0, 99.7, 103.6, at(8, 0), at(12, 0));
    let p2 = stored_setup("p2", "DAX", "bounce", Priority::Secondary, 90.0, 89.0, 92.0, at(8, 0), at(12, 0));
    store.upsert_setup(&p1).unwrap();
    store.upsert_setup(&p2).unwrap();

    engine().run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());

    let p1 = store.setup(&SetupId("p1".into())).unwrap().unwrap();
    let p2 = store.setup(&SetupId("p2".into())).unwrap().unwrap();
    assert_eq!(p1.activated_at, Some(at(8, 30)));
    assert_eq!(p2.status, SetupStatus::Cancelled);
    assert_eq!(
        p2.close_reason,
        Some(CloseReason::Superseded {
            by: SetupId("p1".into())
        })
    );
    // the open orb setup blocks a second one for the same strategy
    assert_eq!(store.setups_for_symbol("DAX").unwrap().len(), 2);
}

// ── 5. Expiry ────────────────────────────────────────────────────────

#[test]
fn untouched_pending_setup_expires() {
    let store = MemoryStore::new();
    let stale = stored_setup("stale", "DAX", "bounce", Priority::Secondary, 90.0, 89.0, 92.0, at(4, 0), at(6, 0));
    store.upsert_setup(&stale).unwrap();

    engine().run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());

    let stale = store.setup(&SetupId("stale".into())).unwrap().unwrap();
    assert_eq!(stale.status, SetupStatus::Cancelled);
    assert_eq!(stale.close_reason, Some(CloseReason::Expired));
    assert_eq!(stale.closed_at, Some(at(6, 5)));
}

// ── 6. Failure isolation ─────────────────────────────────────────────

#[test]
fn bad_symbol_does_not_abort_pass() {
    let store = MemoryStore::new();
    let mut bad = input("BAD");
    bad.candles.swap(0, 1);
    let report = engine().run_pass(&[bad, input("DAX")], &store, &CollectingNotifier::new(), now());

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].symbol, "BAD");
    assert_eq!(report.symbols.len(), 1);
    assert_eq!(report.setups_created(), 1);
}

// ── 7. Setups from every event kind ──────────────────────────────────

#[test]
fn retest_of_broken_edge_becomes_setup() {
    let mut candles = flat("DAX", at(3, 0), at(8, 30), QUIET);
    candles.push(candle("DAX", at(8, 30), 100.0, 101.2, 99.9, 101.0));
    candles.push(candle("DAX", at(8, 35), 101.0, 101.1, 100.25, 100.8));
    candles.extend(flat("DAX", at(8, 40), at(10, 5), [100.8, 100.9, 100.7, 100.8]));
    let input = SymbolInput {
        symbol: "DAX".into(),
        candles,
        levels: None,
    };
    let store = MemoryStore::new();
    let engine = engine_with(vec![strategy("retest", StrategyKind::BreakoutRetest, Priority::Primary)]);
    let report = engine.run_pass(&[input], &store, &CollectingNotifier::new(), now());

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    // breakout and retest both alert, only the retest trades
    assert_eq!(report.alerts_created(), 2);
    assert_eq!(report.setups_created(), 1);

    let s = only_setup(&store, "DAX", "retest");
    assert_eq!(s.side, Side::Long);
    assert_eq!(s.entry, 100.2);
    assert!((s.stop_loss - 100.2 * 0.999).abs() < 1e-9);
    assert_eq!(s.created_at, at(8, 35));
    assert_eq!(s.status, SetupStatus::Pending);
    assert!(matches!(
        s.context,
        DetectionContext::Retest { edge, retest_extreme, .. } if edge == 100.2 && retest_extreme == 100.25
    ));

    let retest_alert = store
        .alerts_for_symbol("DAX", at(0, 0))
        .unwrap()
        .into_iter()
        .find(|a| a.candle_timestamp == at(8, 35))
        .unwrap();
    assert_eq!(retest_alert.setup_id, Some(s.id));
}

#[test]
fn confirmed_session_sweep_becomes_setup() {
    let mut candles = flat("DAX", at(3, 0), at(7, 0), QUIET);
    candles.push(candle("DAX", at(7, 0), 100.0, 100.1, 99.5, 99.9));
    candles.extend(flat("DAX", at(7, 5), at(10, 5), QUIET));
    let input = SymbolInput {
        symbol: "DAX".into(),
        candles,
        levels: None,
    };
    let store = MemoryStore::new();
    let engine = engine_with(vec![strategy("sweep", StrategyKind::SessionSweepReversal, Priority::Secondary)]);
    let report = engine.run_pass(&[input], &store, &CollectingNotifier::new(), now());

    assert_eq!(report.alerts_created(), 1);
    assert_eq!(report.setups_created(), 1);

    let s = only_setup(&store, "DAX", "sweep");
    assert_eq!(s.side, Side::Long);
    assert_eq!(s.created_at, at(7, 15));
    assert_eq!(s.entry, 100.0);
    assert!((s.stop_loss - 99.5 * 0.999).abs() < 1e-9);
    match &s.context {
        DetectionContext::SessionSweep {
            reference_level,
            sweep_extreme,
            sweep_timestamp,
            confirm_candles,
            ..
        } => {
            assert_eq!(*reference_level, 99.8);
            assert_eq!(*sweep_extreme, 99.5);
            assert_eq!(*sweep_timestamp, at(7, 0));
            assert_eq!(*confirm_candles, 3);
        }
        other => panic!("unexpected context {other:?}"),
    }
}

#[test]
fn pivot_touch_becomes_setup_with_levels() {
    let mut candles = flat("DAX", at(3, 0), at(11, 30), QUIET);
    candles.push(candle("DAX", at(11, 30), 100.0, 100.1, 99.02, 99.9));
    candles.extend(flat("DAX", at(11, 35), at(12, 5), QUIET));
    let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    // PP = (104 + 96 + 97) / 3 = 99
    let levels = DailyLevels::from_prior_session("DAX", date, 104.0, 96.0, 97.0).unwrap();
    let input = SymbolInput {
        symbol: "DAX".into(),
        candles,
        levels: Some(levels),
    };
    let store = MemoryStore::new();
    let engine = engine_with(vec![strategy("pivot_bounce", StrategyKind::PivotBounce, Priority::Secondary)]);
    let report = engine.run_pass(&[input], &store, &CollectingNotifier::new(), now());

    assert_eq!(report.alerts_created(), 1);
    assert_eq!(report.setups_created(), 1);

    let s = only_setup(&store, "DAX", "pivot_bounce");
    assert_eq!(s.side, Side::Long);
    assert_eq!(s.entry, 99.9);
    assert!((s.stop_loss - 99.0 * 0.999).abs() < 1e-9);
    assert_eq!(s.levels_date, Some(date));
    assert!(matches!(
        s.context,
        DetectionContext::LevelTouch { level: LevelName::Pivot, touch_price, .. } if touch_price == 99.02
    ));

    let alerts = store.alerts_for_symbol("DAX", at(0, 0)).unwrap();
    assert_eq!(alerts[0].level, Some(LevelName::Pivot));
    assert_eq!(alerts[0].setup_id, Some(s.id));
}

// ── 8. Priority at creation ──────────────────────────────────────────

#[test]
fn new_primary_supersedes_pending_secondary() {
    let store = MemoryStore::new();
    let bounce = stored_setup("bounce", "DAX", "bounce", Priority::Secondary, 90.0, 89.0, 92.0, at(8, 0), at(12, 0));
    store.upsert_setup(&bounce).unwrap();

    let report = engine().run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());
    assert_eq!(report.setups_created(), 1);

    let orb = only_setup(&store, "DAX", "orb");
    let bounce = store.setup(&SetupId("bounce".into())).unwrap().unwrap();
    assert_eq!(bounce.status, SetupStatus::Cancelled);
    assert_eq!(bounce.close_reason, Some(CloseReason::Superseded { by: orb.id }));
    assert_eq!(bounce.closed_at, Some(at(8, 30)));
}

#[test]
fn pending_primary_rejects_new_secondary() {
    let store = MemoryStore::new();
    let held = stored_setup("held", "DAX", "other", Priority::Primary, 90.0, 89.0, 92.0, at(8, 0), at(12, 0));
    store.upsert_setup(&held).unwrap();

    let engine = engine_with(vec![strategy("orb", StrategyKind::OpeningRangeBreakout, Priority::Secondary)]);
    let report = engine.run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());

    assert_eq!(report.setups_created(), 0);
    assert_eq!(report.symbols[0].candidates_rejected, 1);
    let held = store.setup(&SetupId("held".into())).unwrap().unwrap();
    assert_eq!(held.status, SetupStatus::Pending);
    assert!(held.close_reason.is_none());

    // the breakout still alerts, with nothing to link to
    let alerts = store.alerts_for_symbol("DAX", at(0, 0)).unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].setup_id.is_none());
}

// ── 9. Stop-out on the activation candle ─────────────────────────────

#[test]
fn stopped_out_activation_leaves_lower_priority_pending() {
    let store = MemoryStore::new();
    // entry and stop both inside the 08:30 candle
    let p1 = stored_setup("p1", "DAX", "manual", Priority::Primary, 101.0, 100.0, 103.0, at(8, 0), at(12, 0));
    let p2 = stored_setup("p2", "DAX", "bounce", Priority::Secondary, 90.0, 89.0, 92.0, at(8, 0), at(12, 0));
    store.upsert_setup(&p1).unwrap();
    store.upsert_setup(&p2).unwrap();

    let engine = engine_with(vec![strategy("sweep", StrategyKind::SessionSweepReversal, Priority::Secondary)]);
    let report = engine.run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());
    assert_eq!(report.setups_activated(), 1);
    assert_eq!(report.symbols[0].setups_stopped, 1);
    assert_eq!(report.symbols[0].setups_cancelled, 0);

    let p1 = store.setup(&SetupId("p1".into())).unwrap().unwrap();
    assert_eq!(p1.status, SetupStatus::Invalid);
    assert_eq!(p1.activated_at, Some(at(8, 30)));
    assert_eq!(p1.closed_at, Some(at(8, 30)));
    assert_eq!(p1.close_reason, Some(CloseReason::StopHit));

    let p2 = store.setup(&SetupId("p2".into())).unwrap().unwrap();
    assert_eq!(p2.status, SetupStatus::Pending);
    assert!(p2.close_reason.is_none());
}

// ── 10. Alert cooldown ───────────────────────────────────────────────

#[test]
fn oscillating_breakouts_respect_cooldown() {
    let out = [100.5, 101.2, 100.4, 101.0];
    let back_in = [101.0, 101.0, 99.9, 100.0];
    let mut candles = flat("DAX", at(3, 0), at(8, 30), QUIET);
    for (n, ohlc) in [out, back_in, out, back_in, out, back_in, out].iter().enumerate() {
        let t = at(8, 30) + Duration::minutes(5 * n as i64);
        candles.push(candle("DAX", t, ohlc[0], ohlc[1], ohlc[2], ohlc[3]));
    }
    candles.extend(flat("DAX", at(9, 5), at(10, 5), [101.0, 101.2, 100.9, 101.0]));
    let input = SymbolInput {
        symbol: "DAX".into(),
        candles,
        levels: None,
    };
    let store = MemoryStore::new();
    let notifier = CollectingNotifier::new();
    let report = engine().run_pass(&[input], &store, &notifier, now());

    // breakouts at 08:30, 08:40, 08:50 and 09:00; the middle two fall inside 30 minutes
    let dax = &report.symbols[0];
    assert_eq!(dax.alerts_created, 2);
    assert_eq!(dax.alerts_suppressed, 2);
    assert_eq!(notifier.len(), 2);
    let times: Vec<_> = store
        .alerts_for_symbol("DAX", at(0, 0))
        .unwrap()
        .iter()
        .map(|a| a.candle_timestamp)
        .collect();
    assert_eq!(times, vec![at(8, 30), at(9, 0)]);
}

// ── 11. Portfolio limits through the engine ──────────────────────────

fn assert_blocked(store: &MemoryStore, report: &setupflow_core::PassReport, needle: &str) {
    assert_eq!(report.setups_created(), 1);
    assert_eq!(report.setups_activated(), 0);
    assert_eq!(report.symbols[0].activations_blocked, 1);
    let orb = only_setup(store, "DAX", "orb");
    assert_eq!(orb.status, SetupStatus::Cancelled);
    assert!(orb.activated_at.is_none());
    match &orb.close_reason {
        Some(CloseReason::RiskRejected { detail }) => {
            assert!(detail.contains(needle), "{detail}");
        }
        other => panic!("unexpected close reason {other:?}"),
    }
}

#[test]
fn per_symbol_limit_blocks_activation() {
    let store = MemoryStore::new();
    for n in 0..3 {
        store.upsert_setup(&active_setup(&format!("x{n}"), "DAX", 1.0, 0.01)).unwrap();
    }
    let report = engine().run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());
    assert_blocked(&store, &report, "active setups");
}

#[test]
fn aggregate_risk_blocks_activation() {
    let store = MemoryStore::new();
    // 4.5% already at risk; the breakout adds 1%
    store.upsert_setup(&active_setup("spx", "SPX", 450.0, 0.5)).unwrap();
    let report = engine().run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());
    assert_blocked(&store, &report, "aggregate risk");
}

#[test]
fn aggregate_leverage_blocks_activation() {
    let store = MemoryStore::new();
    store.upsert_setup(&active_setup("spx", "SPX", 1.0, 9.5)).unwrap();
    let report = engine().run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());
    assert_blocked(&store, &report, "aggregate leverage");
}

#[test]
fn headroom_under_every_limit_allows_activation() {
    let store = MemoryStore::new();
    for n in 0..2 {
        store.upsert_setup(&active_setup(&format!("x{n}"), "DAX", 1.0, 0.01)).unwrap();
    }
    store.upsert_setup(&active_setup("spx", "SPX", 350.0, 8.0)).unwrap();
    let report = engine().run_pass(&[input("DAX")], &store, &CollectingNotifier::new(), now());
    assert_eq!(report.setups_activated(), 1);
    assert_eq!(report.symbols[0].activations_blocked, 0);
}

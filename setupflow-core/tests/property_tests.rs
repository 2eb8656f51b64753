//! Property tests for indicator, scoring and risk invariants.
//!
//! Uses proptest to verify:
//! 1. EMA shape: output length is `n - p + 1` and the first value is the SMA seed
//! 2. Flat series: RSI is 50, MACD histogram and Bollinger width are zero
//! 3. Sizing identity: size × stop distance equals balance × risk fraction
//! 4. Break-even: the stop moves exactly when open profit reaches the threshold
//! 5. Pivot ordering: S2 ≤ S1 ≤ PP ≤ R1 ≤ R2 for any session
//! 6. Confidence: bounded in [0, 1] and monotone in every sub-score
//! 7. Priority: two setups never supersede each other

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::BTreeMap;

use setupflow_core::config::ScoreWeights;
use setupflow_core::domain::{
    DetectionContext, LevelName, Priority, Setup, SetupId, SetupStatus, Side, StrategyId,
};
use setupflow_core::indicators::{bollinger, ema, macd, pivot_points, rsi, sma};
use setupflow_core::risk::{breakeven_check, position_size, InstrumentClass};
use setupflow_core::validation::{combine, supersedes, Metric};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_series(min_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), min_len..min_len + 60)
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Long), Just(Side::Short)]
}

fn arb_score() -> impl Strategy<Value = f64> {
    0.0..=1.0_f64
}

fn arb_breakdown() -> impl Strategy<Value = BTreeMap<Metric, f64>> {
    prop::collection::vec(arb_score(), 5).prop_map(|scores| {
        Metric::ALL.iter().copied().zip(scores).collect()
    })
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Primary), Just(Priority::Secondary)]
}

// ── Helpers ──────────────────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

fn setup(id: &str, priority: Priority, confidence: f64, start_offset: i64) -> Setup {
    let created = t0() + Duration::minutes(start_offset);
    Setup {
        id: SetupId(id.to_string()),
        symbol: "DAX".into(),
        strategy: StrategyId::new(id),
        side: Side::Long,
        priority,
        entry: 100.0,
        stop_loss: 95.0,
        initial_stop: 95.0,
        take_profit: 110.0,
        confidence,
        breakdown: BTreeMap::new(),
        status: SetupStatus::Pending,
        instrument: InstrumentClass::Cfd,
        position_size: 20.0,
        leverage: 0.2,
        risk_amount: 100.0,
        levels_date: None,
        context: DetectionContext::LevelTouch {
            level: LevelName::Pivot,
            level_price: 100.0,
            touch_price: 100.0,
            volume: 1.0,
            candle_timestamp: created,
        },
        created_at: created,
        expires_at: created + Duration::hours(4),
        activated_at: None,
        closed_at: None,
        last_evaluated: created,
        breakeven_moved: false,
        close_reason: None,
        exit_price: None,
        realized_r: None,
    }
}

// ── 1. EMA Shape ─────────────────────────────────────────────────────

proptest! {
    /// Output length is n - p + 1 and the seed equals the SMA of the first window.
    #[test]
    fn ema_length_and_seed(values in arb_series(30), period in 1usize..30) {
        let out = ema(&values, period).unwrap();
        prop_assert_eq!(out.len(), values.len() - period + 1);
        let seed = sma(&values, period).unwrap()[0];
        prop_assert!((out[0] - seed).abs() < 1e-9);
    }

    /// EMA never leaves the range of its inputs.
    #[test]
    fn ema_stays_within_input_range(values in arb_series(20), period in 1usize..20) {
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for v in ema(&values, period).unwrap() {
            prop_assert!(v >= lo - 1e-9 && v <= hi + 1e-9);
        }
    }

    /// A window longer than the series is an error, not a panic.
    #[test]
    fn ema_rejects_short_series(values in prop::collection::vec(arb_price(), 1..10)) {
        prop_assert!(ema(&values, values.len() + 1).is_err());
    }
}

// ── 2. Flat Series ───────────────────────────────────────────────────

proptest! {
    /// A constant series has neutral momentum and no volatility.
    #[test]
    fn flat_series_is_neutral(price in arb_price(), len in 40usize..80) {
        let values = vec![price; len];

        for v in rsi(&values, 14).unwrap() {
            prop_assert_eq!(v, 50.0);
        }
        let m = macd(&values, 12, 26, 9).unwrap();
        for h in &m.histogram {
            prop_assert!(h.abs() < 1e-9);
        }
        let b = bollinger(&values, 20, 2.0).unwrap();
        for w in &b.width {
            prop_assert!(w.abs() < 1e-9);
        }
    }

    /// RSI stays inside [0, 100] for any series.
    #[test]
    fn rsi_is_bounded(values in arb_series(15)) {
        for v in rsi(&values, 14).unwrap() {
            prop_assert!((0.0..=100.0).contains(&v));
        }
    }
}

// ── 3. Sizing Identity ───────────────────────────────────────────────

proptest! {
    /// The amount lost at the stop is exactly the risked share of the balance.
    #[test]
    fn size_times_distance_is_risk(
        balance in 1_000.0..1_000_000.0_f64,
        risk in 0.001..0.05_f64,
        entry in arb_price(),
        stop_pct in 0.001..0.2_f64,
        side in arb_side(),
    ) {
        let stop = entry * (1.0 - side.sign() * stop_pct);
        let size = position_size(balance, risk, entry, stop).unwrap();
        let lost = size * (entry - stop).abs();
        prop_assert!((lost - balance * risk).abs() <= balance * risk * 1e-9);
    }
}

// ── 4. Break-even ────────────────────────────────────────────────────

proptest! {
    /// The stop moves to entry exactly when r >= threshold; otherwise it is kept.
    #[test]
    fn breakeven_moves_only_past_threshold(
        entry in arb_price(),
        stop_pct in 0.005..0.1_f64,
        move_r in -1.0..3.0_f64,
        threshold in 0.1..2.0_f64,
        side in arb_side(),
    ) {
        let distance = entry * stop_pct;
        let stop = entry - side.sign() * distance;
        let current = entry + side.sign() * move_r * distance;
        let d = breakeven_check(entry, stop, current, side, threshold).unwrap();

        prop_assert_eq!(d.should_move, d.r_multiple >= threshold);
        if d.should_move {
            prop_assert_eq!(d.new_stop, entry);
        } else {
            prop_assert_eq!(d.new_stop, stop);
        }
        prop_assert!((d.r_multiple - move_r).abs() < 1e-6);
    }
}

// ── 5. Pivot Ordering ────────────────────────────────────────────────

proptest! {
    /// Levels are ordered and PP sits between the session low and high.
    #[test]
    fn pivots_are_ordered(low in arb_price(), span in 0.0..100.0_f64, close_frac in 0.0..=1.0_f64) {
        let high = low + span;
        let close = low + span * close_frac;
        let p = pivot_points(high, low, close);
        let eps = 1e-9;
        prop_assert!(p.s2 <= p.s1 + eps);
        prop_assert!(p.s1 <= p.pp + eps);
        prop_assert!(p.pp <= p.r1 + eps);
        prop_assert!(p.r1 <= p.r2 + eps);
        prop_assert!(p.pp >= low - eps && p.pp <= high + eps);
    }
}

// ── 6. Confidence ────────────────────────────────────────────────────

proptest! {
    /// Weighted confidence is a fraction for any sub-scores.
    #[test]
    fn confidence_is_bounded(breakdown in arb_breakdown()) {
        let c = combine(&ScoreWeights::default(), &breakdown);
        prop_assert!((0.0..=1.0 + 1e-12).contains(&c));
    }

    /// Raising any one sub-score never lowers confidence.
    #[test]
    fn confidence_is_monotone(breakdown in arb_breakdown(), which in 0usize..5, bump in 0.0..=1.0_f64) {
        let weights = ScoreWeights::default();
        let before = combine(&weights, &breakdown);

        let metric = Metric::ALL[which];
        let mut raised = breakdown.clone();
        let current = raised[&metric];
        raised.insert(metric, (current + bump).min(1.0));

        prop_assert!(combine(&weights, &raised) >= before - 1e-12);
    }
}

// ── 7. Priority ──────────────────────────────────────────────────────

proptest! {
    /// Supersession is asymmetric.
    #[test]
    fn supersession_is_asymmetric(
        pa in arb_priority(),
        pb in arb_priority(),
        ca in arb_score(),
        cb in arb_score(),
        offset in -300i64..300,
    ) {
        let a = setup("a", pa, ca, 0);
        let b = setup("b", pb, cb, offset);
        prop_assert!(!(supersedes(&a, &b) && supersedes(&b, &a)));
    }

    /// Priority 1 always beats overlapping priority 2 regardless of confidence.
    #[test]
    fn primary_beats_secondary(ca in arb_score(), cb in arb_score(), offset in -200i64..200) {
        let a = setup("a", Priority::Primary, ca, 0);
        let b = setup("b", Priority::Secondary, cb, offset);
        prop_assert!(supersedes(&a, &b));
        prop_assert!(!supersedes(&b, &a));
    }
}

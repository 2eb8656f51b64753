//! Alert deduplication.
//!
//! Alerts sharing `(symbol, kind, reference level)` within the cooldown,
//! measured on candle time, are suppressed. An alert whose id already exists is
//! a replay of a previous pass and is suppressed as well.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Alert, AlertId, AlertKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupDecision {
    Emit,
    /// Same natural key and candle as a stored alert.
    Replay,
    /// Same key as `previous`, too close in candle time.
    Cooldown { previous: AlertId },
}

#[derive(Debug, Clone)]
pub struct AlertDeduper {
    cooldown: Duration,
    seen: BTreeSet<AlertId>,
    by_key: BTreeMap<AlertKey, Vec<(DateTime<Utc>, AlertId)>>,
}

impl AlertDeduper {
    pub fn new<'a>(cooldown: Duration, existing: impl IntoIterator<Item = &'a Alert>) -> Self {
        let mut deduper = Self {
            cooldown,
            seen: BTreeSet::new(),
            by_key: BTreeMap::new(),
        };
        for alert in existing {
            deduper.record(alert);
        }
        deduper
    }

    pub fn check(&self, alert: &Alert) -> DedupDecision {
        if self.seen.contains(&alert.id) {
            return DedupDecision::Replay;
        }
        let within = self.by_key.get(&alert.key()).and_then(|entries| {
            entries
                .iter()
                .find(|(t, _)| (alert.candle_timestamp - *t).abs() < self.cooldown)
        });
        match within {
            Some((_, previous)) => DedupDecision::Cooldown {
                previous: previous.clone(),
            },
            None => DedupDecision::Emit,
        }
    }

    pub fn record(&mut self, alert: &Alert) {
        if self.seen.insert(alert.id.clone()) {
            self.by_key
                .entry(alert.key())
                .or_default()
                .push((alert.candle_timestamp, alert.id.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AlertKind;
    use chrono::TimeZone;

    fn alert(minute: u32, level: f64) -> Alert {
        let t = Utc.with_ymd_and_hms(2024, 6, 3, 10, minute, 0).unwrap();
        Alert::new("DAX", AlertKind::LevelTouch, level, level, None, None, t, t)
    }

    #[test]
    fn replay_is_suppressed() {
        let first = alert(0, 100.0);
        let d = AlertDeduper::new(Duration::minutes(30), [&first]);
        assert_eq!(d.check(&alert(0, 100.0)), DedupDecision::Replay);
    }

    #[test]
    fn cooldown_on_candle_time() {
        let mut d = AlertDeduper::new(Duration::minutes(30), []);
        let first = alert(0, 100.0);
        assert_eq!(d.check(&first), DedupDecision::Emit);
        d.record(&first);

        assert_eq!(
            d.check(&alert(25, 100.0)),
            DedupDecision::Cooldown {
                previous: first.id.clone()
            }
        );
        assert_eq!(d.check(&alert(25, 101.0)), DedupDecision::Emit);

        let later = Alert::new(
            "DAX",
            AlertKind::LevelTouch,
            100.0,
            100.0,
            None,
            None,
            Utc.with_ymd_and_hms(2024, 6, 3, 10, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 3, 10, 30, 0).unwrap(),
        );
        assert_eq!(d.check(&later), DedupDecision::Emit);
    }

    #[test]
    fn zero_cooldown_only_blocks_replays() {
        let mut d = AlertDeduper::new(Duration::zero(), []);
        let first = alert(0, 100.0);
        d.record(&first);
        assert_eq!(d.check(&alert(5, 100.0)), DedupDecision::Emit);
        assert_eq!(d.check(&first), DedupDecision::Replay);
    }
}

//! Persistence and delivery seams.
//!
//! The engine talks to storage, notification and candle data only through the
//! traits below. All store methods take `&self` so one store can be shared by
//! symbol passes running in parallel; implementations make each upsert atomic
//! per row.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::domain::{
    Alert, AlertId, AlertPayload, Candle, CandleError, DailyLevels, LevelsError, Setup, SetupId,
    SetupStatus, Timeframe,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data for {symbol} {timeframe}")]
    NotFound { symbol: String, timeframe: Timeframe },

    #[error("data I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed data in {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error(transparent)]
    Candle(#[from] CandleError),

    #[error(transparent)]
    Levels(#[from] LevelsError),

    #[error("cache error: {0}")]
    Cache(String),
}

/// Result of an upsert keyed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Row already held exactly this value.
    Unchanged,
}

pub trait SetupStore: Send + Sync {
    fn upsert_setup(&self, setup: &Setup) -> Result<UpsertOutcome, StoreError>;

    fn setup(&self, id: &SetupId) -> Result<Option<Setup>, StoreError>;

    /// All setups on `symbol`, oldest first.
    fn setups_for_symbol(&self, symbol: &str) -> Result<Vec<Setup>, StoreError>;

    /// All setups with `status`, oldest first.
    fn setups_with_status(&self, status: SetupStatus) -> Result<Vec<Setup>, StoreError>;
}

pub trait AlertStore: Send + Sync {
    fn upsert_alert(&self, alert: &Alert) -> Result<UpsertOutcome, StoreError>;

    fn alert(&self, id: &AlertId) -> Result<Option<Alert>, StoreError>;

    /// Alerts on `symbol` whose candle is at or after `since`, oldest first.
    fn alerts_for_symbol(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>, StoreError>;

    /// Flag an alert as delivered. Returns false if the id is unknown.
    fn mark_delivered(&self, id: &AlertId) -> Result<bool, StoreError>;
}

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Delivery of new alerts. Delivery itself (push, email, ...) is out of scope.
pub trait Notifier: Send + Sync {
    fn notify(&self, payload: &AlertPayload) -> Result<(), NotifyError>;
}

/// Read access to market data.
pub trait CandleSource: Send + Sync {
    /// Candles in `[from, to]`, oldest first.
    fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError>;

    /// Levels for `date`, if known.
    fn daily_levels(&self, symbol: &str, date: NaiveDate) -> Result<Option<DailyLevels>, DataError>;
}

fn upsert<K: Ord + Clone, V: Clone + PartialEq>(
    map: &mut BTreeMap<K, V>,
    key: &K,
    value: &V,
) -> UpsertOutcome {
    match map.get_mut(key) {
        Some(existing) if existing == value => UpsertOutcome::Unchanged,
        Some(existing) => {
            *existing = value.clone();
            UpsertOutcome::Updated
        }
        None => {
            map.insert(key.clone(), value.clone());
            UpsertOutcome::Inserted
        }
    }
}

fn sort_setups(mut setups: Vec<Setup>) -> Vec<Setup> {
    setups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    setups
}

/// In-process store behind `parking_lot` locks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    setups: RwLock<BTreeMap<SetupId, Setup>>,
    alerts: RwLock<BTreeMap<AlertId, Alert>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setup_count(&self) -> usize {
        self.setups.read().len()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn all_setups(&self) -> Vec<Setup> {
        sort_setups(self.setups.read().values().cloned().collect())
    }

    pub fn all_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.alerts.read().values().cloned().collect();
        alerts.sort_by(|a, b| {
            a.candle_timestamp
                .cmp(&b.candle_timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        alerts
    }
}

impl SetupStore for MemoryStore {
    fn upsert_setup(&self, setup: &Setup) -> Result<UpsertOutcome, StoreError> {
        Ok(upsert(&mut self.setups.write(), &setup.id, setup))
    }

    fn setup(&self, id: &SetupId) -> Result<Option<Setup>, StoreError> {
        Ok(self.setups.read().get(id).cloned())
    }

    fn setups_for_symbol(&self, symbol: &str) -> Result<Vec<Setup>, StoreError> {
        let found = self
            .setups
            .read()
            .values()
            .filter(|s| s.symbol == symbol)
            .cloned()
            .collect();
        Ok(sort_setups(found))
    }

    fn setups_with_status(&self, status: SetupStatus) -> Result<Vec<Setup>, StoreError> {
        let found = self
            .setups
            .read()
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect();
        Ok(sort_setups(found))
    }
}

impl AlertStore for MemoryStore {
    fn upsert_alert(&self, alert: &Alert) -> Result<UpsertOutcome, StoreError> {
        Ok(upsert(&mut self.alerts.write(), &alert.id, alert))
    }

    fn alert(&self, id: &AlertId) -> Result<Option<Alert>, StoreError> {
        Ok(self.alerts.read().get(id).cloned())
    }

    fn alerts_for_symbol(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>, StoreError> {
        let mut found: Vec<Alert> = self
            .alerts
            .read()
            .values()
            .filter(|a| a.symbol == symbol && a.candle_timestamp >= since)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.candle_timestamp.cmp(&b.candle_timestamp));
        Ok(found)
    }

    fn mark_delivered(&self, id: &AlertId) -> Result<bool, StoreError> {
        match self.alerts.write().get_mut(id) {
            Some(alert) => {
                alert.delivered = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Logs each alert at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        info!(
            alert_id = %payload.alert_id,
            kind = %payload.kind,
            symbol = %payload.symbol,
            price = payload.price,
            reference_level = payload.reference_level,
            candle = %payload.candle_timestamp,
            "alert"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _payload: &AlertPayload) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Keeps every payload in memory, in delivery order.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    payloads: Mutex<Vec<AlertPayload>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payloads(&self) -> Vec<AlertPayload> {
        self.payloads.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.payloads.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.lock().is_empty()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        self.payloads.lock().push(payload.clone());
        Ok(())
    }
}

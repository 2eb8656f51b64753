//! Append-only JSONL store for setups and alerts.
//!
//! Every change is appended as one JSON object per line. Opening the file
//! replays it into memory, last write per id wins; a torn trailing line from
//! an interrupted write is skipped. [`JsonlStore::compact`] rewrites the log
//! with one line per row.
//!
//! A change reaches memory only after its line is on disk, so a failed
//! append leaves both views as they were.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use setupflow_core::domain::{Alert, AlertId, Setup, SetupId, SetupStatus};
use setupflow_core::{AlertStore, MemoryStore, SetupStore, StoreError, UpsertOutcome};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Setup(Setup),
    Alert(Alert),
}

pub struct JsonlStore {
    path: PathBuf,
    state: MemoryStore,
    /// Held across the append and the in-memory update so the log order
    /// matches the order changes were applied.
    log: Mutex<File>,
}

impl JsonlStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let state = MemoryStore::new();
        let mut replayed = 0usize;
        let mut torn_tail = false;
        if path.exists() {
            let text = fs::read_to_string(&path)?;
            torn_tail = !text.is_empty() && !text.ends_with('\n');
            for (n, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Record>(line) {
                    Ok(Record::Setup(s)) => {
                        state.upsert_setup(&s)?;
                    }
                    Ok(Record::Alert(a)) => {
                        state.upsert_alert(&a)?;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), line = n + 1, error = %e, "skipping unreadable store record");
                        continue;
                    }
                }
                replayed += 1;
            }
        }

        let mut log = OpenOptions::new().create(true).append(true).open(&path)?;
        if torn_tail {
            // next record starts on its own line
            writeln!(log)?;
        }
        info!(
            path = %path.display(),
            records = replayed,
            setups = state.setup_count(),
            alerts = state.alert_count(),
            "store opened"
        );
        Ok(Self {
            path,
            state,
            log: Mutex::new(log),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn setup_count(&self) -> usize {
        self.state.setup_count()
    }

    pub fn alert_count(&self) -> usize {
        self.state.alert_count()
    }

    pub fn all_setups(&self) -> Vec<Setup> {
        self.state.all_setups()
    }

    pub fn all_alerts(&self) -> Vec<Alert> {
        self.state.all_alerts()
    }

    /// Rewrite the log with the current row set. Atomic: written to a
    /// sibling `.tmp` file, then renamed over the log.
    pub fn compact(&self) -> Result<(), StoreError> {
        let mut log = self.log.lock();
        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut out = BufWriter::new(File::create(&tmp_path)?);
            for s in self.state.all_setups() {
                write_record(&mut out, &Record::Setup(s))?;
            }
            for a in self.state.all_alerts() {
                write_record(&mut out, &Record::Alert(a))?;
            }
            out.flush()?;
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        *log = OpenOptions::new().append(true).open(&self.path)?;
        info!(path = %self.path.display(), "store compacted");
        Ok(())
    }

    fn append(&self, log: &mut File, record: &Record) -> Result<(), StoreError> {
        write_record(log, record)?;
        log.flush()?;
        Ok(())
    }
}

fn write_record(out: &mut impl Write, record: &Record) -> Result<(), StoreError> {
    let json = serde_json::to_string(record)?;
    writeln!(out, "{json}")?;
    Ok(())
}

impl SetupStore for JsonlStore {
    fn upsert_setup(&self, setup: &Setup) -> Result<UpsertOutcome, StoreError> {
        let mut log = self.log.lock();
        if self.state.setup(&setup.id)?.as_ref() == Some(setup) {
            return Ok(UpsertOutcome::Unchanged);
        }
        self.append(&mut log, &Record::Setup(setup.clone()))?;
        self.state.upsert_setup(setup)
    }

    fn setup(&self, id: &SetupId) -> Result<Option<Setup>, StoreError> {
        self.state.setup(id)
    }

    fn setups_for_symbol(&self, symbol: &str) -> Result<Vec<Setup>, StoreError> {
        self.state.setups_for_symbol(symbol)
    }

    fn setups_with_status(&self, status: SetupStatus) -> Result<Vec<Setup>, StoreError> {
        self.state.setups_with_status(status)
    }
}

impl AlertStore for JsonlStore {
    fn upsert_alert(&self, alert: &Alert) -> Result<UpsertOutcome, StoreError> {
        let mut log = self.log.lock();
        if self.state.alert(&alert.id)?.as_ref() == Some(alert) {
            return Ok(UpsertOutcome::Unchanged);
        }
        self.append(&mut log, &Record::Alert(alert.clone()))?;
        self.state.upsert_alert(alert)
    }

    fn alert(&self, id: &AlertId) -> Result<Option<Alert>, StoreError> {
        self.state.alert(id)
    }

    fn alerts_for_symbol(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>, StoreError> {
        self.state.alerts_for_symbol(symbol, since)
    }

    fn mark_delivered(&self, id: &AlertId) -> Result<bool, StoreError> {
        let mut log = self.log.lock();
        let Some(mut alert) = self.state.alert(id)? else {
            return Ok(false);
        };
        if !alert.delivered {
            alert.delivered = true;
            self.append(&mut log, &Record::Alert(alert.clone()))?;
            self.state.upsert_alert(&alert)?;
        }
        Ok(true)
    }
}

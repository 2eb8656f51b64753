//! Daily levels: published level files and recalculation from candles.
//!
//! A levels file is a CSV of prior-session values,
//! `symbol,date,high,low,close`, where `date` is the session the levels are
//! used on. Pivots are derived on load, so a file cannot carry inconsistent
//! R/S values.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use setupflow_core::domain::{DailyLevels, Timeframe};
use setupflow_core::{CandleSource, DataError};

/// Calendar days searched backwards for a prior session (weekends, holidays).
pub const MAX_SESSION_GAP_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
struct LevelsRow {
    symbol: String,
    date: NaiveDate,
    high: f64,
    low: f64,
    close: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LevelsFile {
    levels: BTreeMap<(String, NaiveDate), DailyLevels>,
}

impl LevelsFile {
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::Malformed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut file = Self::default();
        for (line, row) in reader.deserialize::<LevelsRow>().enumerate() {
            let row = row.map_err(|e| DataError::Malformed {
                path: path.display().to_string(),
                reason: format!("row {}: {e}", line + 1),
            })?;
            let levels =
                DailyLevels::from_prior_session(&row.symbol, row.date, row.high, row.low, row.close)?;
            file.insert(levels);
        }
        debug!(path = %path.display(), count = file.len(), "loaded levels file");
        Ok(file)
    }

    pub fn insert(&mut self, levels: DailyLevels) {
        self.levels
            .insert((levels.symbol.clone(), levels.date), levels);
    }

    pub fn get(&self, symbol: &str, date: NaiveDate) -> Option<&DailyLevels> {
        self.levels.get(&(symbol.to_string(), date))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Levels for `date` from the most recent earlier session with candles.
///
/// Returns `Ok(None)` when no session exists within [`MAX_SESSION_GAP_DAYS`].
pub fn recalculate(
    source: &dyn CandleSource,
    symbol: &str,
    timeframe: Timeframe,
    date: NaiveDate,
) -> Result<Option<DailyLevels>, DataError> {
    for back in 1..=MAX_SESSION_GAP_DAYS {
        let day = date - Duration::days(back);
        let from = day.and_time(NaiveTime::MIN).and_utc();
        let to = from + Duration::days(1) - Duration::milliseconds(1);
        let session = match source.candles(symbol, timeframe, from, to) {
            Ok(candles) => candles,
            Err(DataError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if let Some(levels) = DailyLevels::from_session_candles(symbol, date, &session) {
            let levels = levels?;
            debug!(symbol, %date, prior_session = %day, pivot = levels.pivot, "recalculated levels");
            return Ok(Some(levels));
        }
    }
    Ok(None)
}

/// Write full level tables (pivots included) as CSV.
pub fn write_levels_csv(path: &Path, levels: &[DailyLevels]) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| DataError::Malformed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    for row in levels {
        writer.serialize(row).map_err(|e| DataError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

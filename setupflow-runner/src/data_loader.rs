//! Candle sources backed by files.
//!
//! - [`CsvCandleSource`]: `{dir}/{SYMBOL}_{tf}.csv` with an RFC 3339
//!   `timestamp` column followed by `open,high,low,close,volume`.
//! - [`ParquetCandleCache`]: Hive-style partitions at
//!   `{cache_dir}/symbol={SYMBOL}/{year}.parquet`, one row per candle, all
//!   timeframes of a symbol in the same file. Writes merge with the existing
//!   partition and land atomically (write `.tmp`, rename into place).
//!
//! Both recalculate daily levels from the prior session when no published
//! levels are attached.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use polars::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use setupflow_core::domain::{Candle, DailyLevels, Timeframe};
use setupflow_core::{CandleSource, DataError};

use crate::levels::{recalculate, LevelsFile};

fn malformed(path: &Path, reason: impl ToString) -> DataError {
    DataError::Malformed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

// ── CSV ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

pub struct CsvCandleSource {
    dir: PathBuf,
    timeframe: Timeframe,
    levels: Option<LevelsFile>,
}

impl CsvCandleSource {
    /// `timeframe` is the resolution used when recalculating daily levels.
    pub fn new(dir: impl Into<PathBuf>, timeframe: Timeframe) -> Self {
        Self {
            dir: dir.into(),
            timeframe,
            levels: None,
        }
    }

    pub fn with_levels(mut self, levels: LevelsFile) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir.join(format!("{symbol}_{timeframe}.csv"))
    }

    /// Every candle in the file, oldest first.
    pub fn load_all(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| malformed(&path, e))?;

        let mut candles = Vec::new();
        for (line, row) in reader.deserialize::<CandleRow>().enumerate() {
            let row = row.map_err(|e| malformed(&path, format!("row {}: {e}", line + 1)))?;
            candles.push(Candle::new(
                symbol,
                timeframe,
                row.timestamp,
                row.open,
                row.high,
                row.low,
                row.close,
                row.volume,
            )?);
        }
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        debug!(symbol, %timeframe, count = candles.len(), "loaded csv candles");
        Ok(candles)
    }
}

impl CandleSource for CsvCandleSource {
    fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError> {
        let mut candles = self.load_all(symbol, timeframe)?;
        candles.retain(|c| c.timestamp >= from && c.timestamp <= to);
        Ok(candles)
    }

    fn daily_levels(&self, symbol: &str, date: NaiveDate) -> Result<Option<DailyLevels>, DataError> {
        if let Some(published) = self.levels.as_ref().and_then(|lv| lv.get(symbol, date)) {
            return Ok(Some(published.clone()));
        }
        recalculate(self, symbol, self.timeframe, date)
    }
}

// ── Parquet ──────────────────────────────────────────────────────────

const COLUMNS: [&str; 7] = ["timestamp", "timeframe", "open", "high", "low", "close", "volume"];

pub struct ParquetCandleCache {
    cache_dir: PathBuf,
    timeframe: Timeframe,
    levels: Option<LevelsFile>,
}

impl ParquetCandleCache {
    pub fn new(cache_dir: impl Into<PathBuf>, timeframe: Timeframe) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            timeframe,
            levels: None,
        }
    }

    pub fn with_levels(mut self, levels: LevelsFile) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn year_path(&self, symbol: &str, year: i32) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{year}.parquet"))
    }

    /// Merge `candles` into the cache. Rows with the same timeframe and
    /// timestamp are replaced.
    pub fn write(&self, symbol: &str, candles: &[Candle]) -> Result<(), DataError> {
        if candles.is_empty() {
            return Err(DataError::Cache("no candles to cache".into()));
        }
        if let Some(other) = candles.iter().find(|c| c.symbol != symbol) {
            return Err(DataError::Cache(format!(
                "candle for {} written under {symbol}",
                other.symbol
            )));
        }
        fs::create_dir_all(self.symbol_dir(symbol))?;

        let mut by_year: BTreeMap<i32, Vec<&Candle>> = BTreeMap::new();
        for candle in candles {
            by_year.entry(candle.timestamp.year()).or_default().push(candle);
        }

        for (year, fresh) in by_year {
            let path = self.year_path(symbol, year);
            let mut merged: BTreeMap<(Timeframe, DateTime<Utc>), Candle> = BTreeMap::new();
            if path.exists() {
                for c in read_partition(&path, symbol)? {
                    merged.insert((c.timeframe, c.timestamp), c);
                }
            }
            for c in fresh {
                merged.insert((c.timeframe, c.timestamp), c.clone());
            }
            let rows: Vec<&Candle> = merged.values().collect();
            let mut df = candles_to_dataframe(&rows)?;

            let tmp_path = path.with_extension("parquet.tmp");
            write_parquet(&mut df, &tmp_path)?;
            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::Cache(format!("atomic rename failed: {e}"))
            })?;
            debug!(symbol, year, rows = rows.len(), "wrote parquet partition");
        }
        Ok(())
    }

    /// Every cached candle for `symbol` at `timeframe`, oldest first.
    /// Corrupt partitions are quarantined and skipped.
    pub fn load(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        let dir = self.symbol_dir(symbol);
        if !dir.exists() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            });
        }

        let mut candles = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            match read_partition(&path, symbol) {
                Ok(rows) => candles.extend(rows.into_iter().filter(|c| c.timeframe == timeframe)),
                Err(e) => {
                    let quarantine = path.with_extension("parquet.quarantined");
                    warn!(path = %path.display(), error = %e, "quarantining corrupt cache partition");
                    let _ = fs::rename(&path, &quarantine);
                }
            }
        }

        if candles.is_empty() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

impl CandleSource for ParquetCandleCache {
    fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError> {
        let mut candles = self.load(symbol, timeframe)?;
        candles.retain(|c| c.timestamp >= from && c.timestamp <= to);
        Ok(candles)
    }

    fn daily_levels(&self, symbol: &str, date: NaiveDate) -> Result<Option<DailyLevels>, DataError> {
        if let Some(published) = self.levels.as_ref().and_then(|lv| lv.get(symbol, date)) {
            return Ok(Some(published.clone()));
        }
        recalculate(self, symbol, self.timeframe, date)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn candles_to_dataframe(candles: &[&Candle]) -> Result<DataFrame, DataError> {
    let timestamps: Vec<i64> = candles.iter().map(|c| c.timestamp.timestamp_millis()).collect();
    let timeframes: Vec<String> = candles.iter().map(|c| c.timeframe.to_string()).collect();
    let opens: Vec<f64> = candles.iter().map(|c| c.open).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps),
        Column::new("timeframe".into(), timeframes),
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Cache(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path)?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::Cache(format!("write parquet: {e}")))?;
    Ok(())
}

fn read_partition(path: &Path, symbol: &str) -> Result<Vec<Candle>, DataError> {
    let file = fs::File::open(path)?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| malformed(path, format!("read: {e}")))?;
    if df.height() == 0 {
        return Err(malformed(path, "empty partition"));
    }
    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(malformed(path, format!("missing column '{name}'")));
        }
    }
    dataframe_to_candles(&df, path, symbol)
}

fn dataframe_to_candles(df: &DataFrame, path: &Path, symbol: &str) -> Result<Vec<Candle>, DataError> {
    let col = |name: &str| df.column(name).map_err(|e| malformed(path, e));
    let typed = |e: PolarsError| malformed(path, format!("column type: {e}"));

    let ts = col("timestamp")?.i64().map_err(typed)?;
    let tf = col("timeframe")?.str().map_err(typed)?;
    let open = col("open")?.f64().map_err(typed)?;
    let high = col("high")?.f64().map_err(typed)?;
    let low = col("low")?.f64().map_err(typed)?;
    let close = col("close")?.f64().map_err(typed)?;
    let volume = col("volume")?.f64().map_err(typed)?;

    let mut candles = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let null = |name: &str| malformed(path, format!("null {name} at row {i}"));
        let millis = ts.get(i).ok_or_else(|| null("timestamp"))?;
        let timestamp = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| malformed(path, format!("timestamp {millis} out of range")))?;
        let timeframe: Timeframe = tf.get(i).ok_or_else(|| null("timeframe"))?.parse()?;
        candles.push(Candle::new(
            symbol,
            timeframe,
            timestamp,
            open.get(i).ok_or_else(|| null("open"))?,
            high.get(i).ok_or_else(|| null("high"))?,
            low.get(i).ok_or_else(|| null("low"))?,
            close.get(i).ok_or_else(|| null("close"))?,
            volume.get(i).unwrap_or(0.0),
        )?);
    }
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::io::Write;

    fn t(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, h, m, 0).unwrap()
    }

    fn candle(ts: DateTime<Utc>, close: f64) -> Candle {
        Candle::new("DAX", Timeframe::M5, ts, close, close + 1.0, close - 1.0, close, 10.0).unwrap()
    }

    fn write_csv(dir: &Path, name: &str, body: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    const CSV: &str = "timestamp,open,high,low,close,volume\n\
        2024-06-03T09:05:00Z,101,102,100,101.5,20\n\
        2024-06-03T09:00:00Z,100,101,99,100.5,10\n\
        2024-06-03T09:10:00Z,101.5,103,101,102,30\n";

    #[test]
    fn csv_loads_sorted_and_filters_range() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "DAX_m5.csv", CSV);
        let source = CsvCandleSource::new(dir.path(), Timeframe::M5);

        let all = source.load_all("DAX", Timeframe::M5).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].timestamp, t(3, 9, 0));
        assert_eq!(all[2].close, 102.0);

        let window = source
            .candles("DAX", Timeframe::M5, t(3, 9, 5), t(3, 9, 10))
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].timestamp, t(3, 9, 5));
    }

    #[test]
    fn csv_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvCandleSource::new(dir.path(), Timeframe::M5);
        assert!(matches!(
            source.load_all("DAX", Timeframe::M5),
            Err(DataError::NotFound { .. })
        ));
    }

    #[test]
    fn csv_rejects_inconsistent_candle() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "DAX_m5.csv",
            "timestamp,open,high,low,close,volume\n2024-06-03T09:00:00Z,100,99,98,100.5,10\n",
        );
        let source = CsvCandleSource::new(dir.path(), Timeframe::M5);
        assert!(matches!(
            source.load_all("DAX", Timeframe::M5),
            Err(DataError::Candle(_))
        ));
    }

    #[test]
    fn csv_reports_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "DAX_m5.csv",
            "timestamp,open,high,low,close,volume\nyesterday,100,101,99,100.5,10\n",
        );
        let source = CsvCandleSource::new(dir.path(), Timeframe::M5);
        assert!(matches!(
            source.load_all("DAX", Timeframe::M5),
            Err(DataError::Malformed { .. })
        ));
    }

    #[test]
    fn parquet_write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCandleCache::new(dir.path(), Timeframe::M5);
        let candles: Vec<Candle> = (0..12)
            .map(|i| candle(t(3, 9, 0) + Duration::minutes(5 * i), 100.0 + i as f64))
            .collect();

        cache.write("DAX", &candles).unwrap();
        assert!(dir.path().join("symbol=DAX").join("2024.parquet").exists());

        let loaded = cache.load("DAX", Timeframe::M5).unwrap();
        assert_eq!(loaded, candles);
        assert!(cache.load("DAX", Timeframe::H1).is_err());
    }

    #[test]
    fn parquet_write_merges_with_existing_partition() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCandleCache::new(dir.path(), Timeframe::M5);
        cache
            .write("DAX", &[candle(t(3, 9, 0), 100.0), candle(t(3, 9, 5), 101.0)])
            .unwrap();
        cache
            .write("DAX", &[candle(t(3, 9, 5), 105.0), candle(t(3, 9, 10), 106.0)])
            .unwrap();

        let loaded = cache.load("DAX", Timeframe::M5).unwrap();
        let closes: Vec<f64> = loaded.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![100.0, 105.0, 106.0]);
    }

    #[test]
    fn parquet_quarantines_corrupt_partition() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCandleCache::new(dir.path(), Timeframe::M5);
        cache.write("DAX", &[candle(t(3, 9, 0), 100.0)]).unwrap();
        let sym_dir = dir.path().join("symbol=DAX");
        fs::write(sym_dir.join("2023.parquet"), b"not parquet").unwrap();

        let loaded = cache.load("DAX", Timeframe::M5).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(sym_dir.join("2023.parquet.quarantined").exists());
    }

    #[test]
    fn parquet_refuses_foreign_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCandleCache::new(dir.path(), Timeframe::M5);
        assert!(cache.write("NDX", &[candle(t(3, 9, 0), 100.0)]).is_err());
    }
}

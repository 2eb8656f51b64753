//! Batch pass across symbols.
//!
//! Symbols are loaded and evaluated in parallel with rayon. Each symbol is
//! evaluated by exactly one worker, so setups and alerts (keyed per symbol)
//! have a single writer. Portfolio limits span symbols, so activations go
//! through the engine's activation guard one at a time. A symbol that fails
//! to load or evaluate is recorded in the report and the rest go on.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{info, info_span, warn};

use setupflow_core::domain::{MarketSnapshot, Timeframe};
use setupflow_core::lifecycle::SymbolFailure;
use setupflow_core::store::{LogNotifier, Notifier};
use setupflow_core::{
    AlertStore, CandleSource, DataError, LifecycleEngine, PassReport, SetupStore, SymbolInput,
};

use crate::config::{RunnerConfig, SourceKind};
use crate::data_loader::{CsvCandleSource, ParquetCandleCache};
use crate::levels::LevelsFile;
use crate::outbox::JsonlOutbox;
use crate::store::JsonlStore;
use crate::synthetic::SyntheticSource;

fn load_symbol(
    source: &dyn CandleSource,
    symbol: &str,
    timeframe: Timeframe,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<SymbolInput, DataError> {
    let candles = source.candles(symbol, timeframe, from, to)?;
    let levels = match candles.last() {
        Some(last) => source.daily_levels(symbol, last.trading_date())?,
        None => None,
    };
    Ok(SymbolInput {
        symbol: symbol.to_string(),
        candles,
        levels,
    })
}

/// Candles in `[from, to]` and that day's levels for every symbol, in input
/// order. Symbols whose data cannot be loaded come back as failures.
pub fn load_inputs(
    source: &dyn CandleSource,
    symbols: &[String],
    timeframe: Timeframe,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> (Vec<SymbolInput>, Vec<SymbolFailure>) {
    let loaded: Vec<(String, Result<SymbolInput, DataError>)> = symbols
        .par_iter()
        .map(|symbol| (symbol.clone(), load_symbol(source, symbol, timeframe, from, to)))
        .collect();

    let mut inputs = Vec::with_capacity(loaded.len());
    let mut failures = Vec::new();
    for (symbol, result) in loaded {
        match result {
            Ok(input) if input.candles.is_empty() => {
                warn!(%symbol, "no candles in scan window");
                failures.push(SymbolFailure {
                    symbol,
                    error: "no candles in scan window".into(),
                });
            }
            Ok(input) => inputs.push(input),
            Err(e) => {
                warn!(%symbol, error = %e, "failed to load candles");
                failures.push(SymbolFailure {
                    symbol,
                    error: e.to_string(),
                });
            }
        }
    }
    (inputs, failures)
}

/// Evaluate every input in parallel against one shared market snapshot.
pub fn run_batch<S>(
    engine: &LifecycleEngine,
    inputs: &[SymbolInput],
    store: &S,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> PassReport
where
    S: SetupStore + AlertStore + ?Sized,
{
    let market = MarketSnapshot::from_series(inputs.iter().map(|i| i.candles.as_slice()));
    let results: Vec<_> = inputs
        .par_iter()
        .map(|input| {
            let result = engine.evaluate_symbol(input, &market, store, notifier, now);
            (input.symbol.as_str(), result)
        })
        .collect();

    let mut report = PassReport::default();
    for (symbol, result) in results {
        report.record(symbol, result);
    }
    info!(
        symbols = report.symbols.len(),
        failures = report.failures.len(),
        alerts = report.alerts_created(),
        setups = report.setups_created(),
        activated = report.setups_activated(),
        "batch complete"
    );
    report
}

/// Candle source selected by `[data]`, with published levels attached when
/// a levels file is configured.
pub fn open_source(cfg: &RunnerConfig) -> Result<Box<dyn CandleSource>> {
    let levels = match &cfg.data.levels_file {
        Some(path) => Some(
            LevelsFile::load(path)
                .with_context(|| format!("failed to load levels file {}", path.display()))?,
        ),
        None => None,
    };

    let source: Box<dyn CandleSource> = match cfg.data.source {
        SourceKind::Csv => {
            let src = CsvCandleSource::new(&cfg.data.candle_dir, cfg.timeframe);
            Box::new(match levels {
                Some(lv) => src.with_levels(lv),
                None => src,
            })
        }
        SourceKind::Parquet => {
            let src = ParquetCandleCache::new(&cfg.data.cache_dir, cfg.timeframe);
            Box::new(match levels {
                Some(lv) => src.with_levels(lv),
                None => src,
            })
        }
        SourceKind::Synthetic => {
            warn!("using synthetic candles; setups and alerts are not market data");
            Box::new(SyntheticSource::new(cfg.timeframe))
        }
    };
    Ok(source)
}

/// One scheduled scan: load the lookback window ending at `now`, evaluate
/// every symbol and persist to the configured store and outbox.
pub fn run_scan(cfg: &RunnerConfig, now: DateTime<Utc>) -> Result<PassReport> {
    let span = info_span!("scan", %now, symbols = cfg.symbols.len());
    let _guard = span.enter();

    let engine = LifecycleEngine::new(cfg.engine.clone()).context("invalid engine configuration")?;
    let source = open_source(cfg)?;
    let store = JsonlStore::open(&cfg.output.store_path).with_context(|| {
        format!("failed to open store {}", cfg.output.store_path.display())
    })?;
    let notifier: Box<dyn Notifier> = match &cfg.output.outbox_path {
        Some(path) => Box::new(
            JsonlOutbox::open(path)
                .with_context(|| format!("failed to open outbox {}", path.display()))?,
        ),
        None => Box::new(LogNotifier),
    };

    let (inputs, load_failures) =
        load_inputs(source.as_ref(), &cfg.symbols, cfg.timeframe, now - cfg.lookback(), now);
    let mut report = run_batch(&engine, &inputs, &store, notifier.as_ref(), now);
    report.failures.extend(load_failures);
    Ok(report)
}

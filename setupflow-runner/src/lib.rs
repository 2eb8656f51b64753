//! SetupFlow Runner: batch orchestration around `setupflow-core`.
//!
//! This crate provides:
//! - Runner configuration (symbols, data source, output paths, engine settings)
//! - Candle loading from CSV files or a Parquet cache, plus synthetic candles
//! - Daily level files and recalculation from the prior session
//! - Append-only JSONL setup/alert store and alert outbox
//! - Parallel per-symbol passes with rayon
//! - Logging initialization

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod levels;
pub mod logging;
pub mod outbox;
pub mod store;
pub mod synthetic;

pub use batch::{load_inputs, open_source, run_batch, run_scan};
pub use config::{DataConfig, OutputConfig, RunnerConfig, SourceKind};
pub use data_loader::{CsvCandleSource, ParquetCandleCache};
pub use levels::{recalculate, write_levels_csv, LevelsFile};
pub use logging::{init as init_logging, LogFormat, LoggingConfig, LoggingError};
pub use outbox::JsonlOutbox;
pub use store::JsonlStore;
pub use synthetic::SyntheticSource;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn shared_across_workers() {
        assert_send::<JsonlStore>();
        assert_sync::<JsonlStore>();
        assert_send::<JsonlOutbox>();
        assert_sync::<JsonlOutbox>();
        assert_sync::<CsvCandleSource>();
        assert_sync::<ParquetCandleCache>();
        assert_sync::<SyntheticSource>();
    }
}

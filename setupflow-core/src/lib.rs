//! SetupFlow Core: trading-signal decision pipeline.
//!
//! This crate turns candles into scored, risk-sized, lifecycle-tracked setups
//! and deduplicated alerts:
//! - Domain types (candles, daily levels, setups, alerts, ids)
//! - Indicator Engine: pure functions over price and volume series
//! - Validation Engine: weighted five-factor confidence and priority override
//! - Risk Calculator: sizing, leverage, break-even, trade and portfolio checks
//! - Lifecycle Engine: event detection, setup state machine, symbol passes
//! - Store, notifier and candle-source traits plus an in-memory store

pub mod config;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod lifecycle;
pub mod risk;
pub mod store;
pub mod validation;

pub use config::{ConfigError, EngineConfig, StrategyBook};
pub use error::EvaluationError;
pub use lifecycle::{LifecycleEngine, PassReport, SymbolInput, SymbolReport};
pub use store::{
    AlertStore, CandleSource, DataError, MemoryStore, Notifier, SetupStore, StoreError,
    UpsertOutcome,
};

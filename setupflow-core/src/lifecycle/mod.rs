//! Setup / Alert Lifecycle Engine.

pub mod dedup;
pub mod detect;
pub mod engine;
pub mod session;
pub mod state;
pub mod strategy;

pub use dedup::{AlertDeduper, DedupDecision};
pub use detect::{detect_events, MarketEvent};
pub use engine::{LifecycleEngine, PassReport, SymbolFailure, SymbolInput, SymbolReport};
pub use session::{opening_range, session_extremes, OpeningRange};
pub use state::ActiveOutcome;
pub use strategy::candidate_for;

//! Validation Engine.
//!
//! Scores a candidate setup on five independent factors, combines them with
//! fixed weights into a confidence in [0, 1], and compares the result with the
//! strategy's threshold. A failed validation is an ordinary outcome, not an
//! error.

pub mod engine;
pub mod patterns;
pub mod priority;
pub mod scores;

pub use engine::{combine, Candidate, ValidationEngine, ValidationRejected, ValidationResult};
pub use patterns::{detect_pattern, CandlePattern};
pub use priority::{cancels_on_activation, resolve_conflicts, supersedes, Resolution};

use serde::{Deserialize, Serialize};
use std::fmt;

/// One validation factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    EmaAlignment,
    PivotConfluence,
    VolumeConfirmation,
    CandleStructure,
    ContextFlow,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::EmaAlignment,
        Metric::PivotConfluence,
        Metric::VolumeConfirmation,
        Metric::CandleStructure,
        Metric::ContextFlow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::EmaAlignment => "ema_alignment",
            Metric::PivotConfluence => "pivot_confluence",
            Metric::VolumeConfirmation => "volume_confirmation",
            Metric::CandleStructure => "candle_structure",
            Metric::ContextFlow => "context_flow",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

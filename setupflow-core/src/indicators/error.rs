use thiserror::Error;

/// Errors raised by indicator functions. Always propagated to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("{indicator}: need at least {required} values, got {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    #[error("{indicator}: period must be >= 1 (got {period})")]
    InvalidPeriod {
        indicator: &'static str,
        period: usize,
    },
}

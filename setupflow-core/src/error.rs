use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{CandleError, LevelsError};
use crate::indicators::IndicatorError;
use crate::risk::RiskError;
use crate::store::{DataError, StoreError};

/// Failure of one symbol pass. The pass loop logs it and moves on.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Candle(#[from] CandleError),

    #[error(transparent)]
    Levels(#[from] LevelsError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no market snapshot entry for {0}")]
    MissingMarketData(String),

    #[error("{symbol}: candle at {timestamp} is out of order or belongs to {found}")]
    UnorderedCandles {
        symbol: String,
        found: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

//! Error taxonomy for the engine.
//!
//! Every variant aborts the run before any snapshot is produced. Days where a
//! signal cannot be acted on (halt, price limit, unaffordable lot) are normal
//! flow and never surface here.

use chrono::NaiveDate;
use thiserror::Error;

/// Invalid engine or fee parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial capital must be positive (got {0})")]
    NonPositiveCapital(f64),

    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("lot size must be at least 1")]
    ZeroLotSize,

    #[error("price tick must be positive (got {0})")]
    InvalidPriceTick(f64),

    #[error("moving-average period must be at least 1")]
    ZeroPeriod,

    #[error("moving-average windows must satisfy 1 <= short < long (got {short}/{long})")]
    InvalidWindows { short: usize, long: usize },
}

/// Bar sequence that violates the engine's input contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("bar sequence is empty")]
    Empty,

    #[error("bar {index} ({date}) is not after the previous bar ({previous})")]
    Unsorted {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("bar {index} repeats date {date}")]
    DuplicateDate { index: usize, date: NaiveDate },

    #[error("bar {index} ({date}) has a non-positive or non-finite price")]
    InvalidPrice { index: usize, date: NaiveDate },

    #[error("bar {index} ({date}) has invalid volume {volume}")]
    InvalidVolume {
        index: usize,
        date: NaiveDate,
        volume: f64,
    },
}

/// Errors from a simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

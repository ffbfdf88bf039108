//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::signal::Signal;

/// Daily OHLCV quote for one instrument, before any signal is attached.
///
/// This is what the CSV loader and the synthetic generator produce. Signal
/// stamping turns a `&[RawBar]` into the `Vec<Bar>` the engine replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub code: String,
    pub open: f64,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: f64,
}

/// One trading day as seen by the simulation engine.
///
/// `high`/`low` are carried for reporting only; the engine executes at the
/// open (or close) and values at the close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: f64,
    pub signal: Signal,
}

impl Bar {
    pub fn from_raw(raw: &RawBar, signal: Signal) -> Self {
        Self {
            date: raw.date,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            signal,
        }
    }

    /// A session with zero traded volume.
    pub fn is_halted(&self) -> bool {
        self.volume == 0.0
    }

    /// Open and close are finite and strictly positive; high/low, when
    /// present, are too.
    pub fn has_valid_prices(&self) -> bool {
        let positive = |p: f64| p.is_finite() && p > 0.0;
        positive(self.open)
            && positive(self.close)
            && self.high.map_or(true, positive)
            && self.low.map_or(true, positive)
    }
}

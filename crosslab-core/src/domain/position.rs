//! Position state — cash and shares held for the single traded instrument.

use serde::{Deserialize, Serialize};

/// Flat or long. There is no short state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Flat,
    Long,
}

/// Cash balance and share count.
///
/// Only the simulation engine mutates this, and at most once per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionState {
    pub cash: f64,
    pub shares: u64,
}

impl PositionState {
    pub fn new(cash: f64) -> Self {
        Self { cash, shares: 0 }
    }

    pub fn side(&self) -> PositionSide {
        if self.shares > 0 {
            PositionSide::Long
        } else {
            PositionSide::Flat
        }
    }

    pub fn is_long(&self) -> bool {
        self.shares > 0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    pub fn total_value(&self, price: f64) -> f64 {
        self.cash + self.market_value(price)
    }
}

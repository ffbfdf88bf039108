//! Portfolio snapshot — end-of-bar valuation record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::position::PositionState;

/// Portfolio state recorded once per input bar.
///
/// The accounting identity `total_value == cash + position_value` holds for
/// every snapshot, and `position_value == shares * mark_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub shares: u64,
    pub mark_price: f64,
    pub position_value: f64,
    pub total_value: f64,
}

impl PortfolioSnapshot {
    pub fn capture(date: NaiveDate, state: &PositionState, mark_price: f64) -> Self {
        Self {
            date,
            cash: state.cash,
            shares: state.shares,
            mark_price,
            position_value: state.market_value(mark_price),
            total_value: state.total_value(mark_price),
        }
    }
}

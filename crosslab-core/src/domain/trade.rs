//! Trade — one executed buy or sell leg.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

/// An executed trade. Appended to the trade log when it fills and never
/// touched again.
///
/// `value` is the notional `price * shares`; fees are reported separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub side: TradeSide,
    pub price: f64,
    pub shares: u64,
    pub value: f64,
    pub fees: f64,
}

impl Trade {
    pub fn new(date: NaiveDate, side: TradeSide, price: f64, shares: u64, fees: f64) -> Self {
        Self {
            date,
            side,
            price,
            shares,
            value: price * shares as f64,
            fees,
        }
    }

    /// Cash moved by this trade, fees included: negative for buys.
    pub fn cash_flow(&self) -> f64 {
        match self.side {
            TradeSide::Buy => -(self.value + self.fees),
            TradeSide::Sell => self.value - self.fees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn value_excludes_fees() {
        let trade = Trade::new(date(), TradeSide::Buy, 10.5, 900, 5.0);
        assert!((trade.value - 9450.0).abs() < 1e-9);
        assert!((trade.cash_flow() + 9455.0).abs() < 1e-9);
    }

    #[test]
    fn sell_cash_flow_is_net_of_fees() {
        let trade = Trade::new(date(), TradeSide::Sell, 9.0, 900, 13.1);
        assert!((trade.cash_flow() - (8100.0 - 13.1)).abs() < 1e-9);
    }

    #[test]
    fn side_serializes_lowercase() {
        let json = serde_json::to_string(&TradeSide::Sell).unwrap();
        assert_eq!(json, "\"sell\"");
    }
}

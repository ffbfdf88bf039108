//! Fee model — commission, stamp tax and transfer fee for one trade.
//!
//! Commission is charged on both sides with an optional minimum per trade.
//! Stamp tax is sell-side only. The transfer fee is per share and applies only
//! to instruments listed on the exchange whose code prefix is configured
//! (Shanghai, `"sh"`, in the reference market).

use serde::{Deserialize, Serialize};

use crate::domain::TradeSide;
use crate::error::ConfigError;

/// Fee parameters for a run. Immutable once the engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Commission as a fraction of notional, both sides.
    pub commission_rate: f64,
    /// Minimum commission per trade, applied when `use_commission_floor` is set.
    pub min_commission: f64,
    pub use_commission_floor: bool,
    /// Stamp tax as a fraction of notional, sells only.
    pub stamp_tax_rate: f64,
    /// Transfer fee per share.
    pub transfer_fee_rate: f64,
    /// Instrument code prefix that identifies the transfer-fee exchange.
    pub transfer_fee_prefix: String,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            commission_rate: 0.0003,
            min_commission: 5.0,
            use_commission_floor: true,
            stamp_tax_rate: 0.001,
            transfer_fee_rate: 0.001,
            transfer_fee_prefix: "sh".into(),
        }
    }
}

/// Fee components of a single trade.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeeBreakdown {
    pub commission: f64,
    pub stamp_tax: f64,
    pub transfer_fee: f64,
}

impl FeeBreakdown {
    pub fn total(&self) -> f64 {
        self.commission + self.stamp_tax + self.transfer_fee
    }
}

impl FeeSchedule {
    pub fn frictionless() -> Self {
        Self {
            commission_rate: 0.0,
            min_commission: 0.0,
            use_commission_floor: false,
            stamp_tax_rate: 0.0,
            transfer_fee_rate: 0.0,
            transfer_fee_prefix: "sh".into(),
        }
    }

    /// Reference rates with the minimum-commission floor switched off.
    pub fn without_floor() -> Self {
        Self {
            use_commission_floor: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = [
            ("commission_rate", self.commission_rate),
            ("min_commission", self.min_commission),
            ("stamp_tax_rate", self.stamp_tax_rate),
            ("transfer_fee_rate", self.transfer_fee_rate),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        Ok(())
    }

    pub fn applies_transfer_fee(&self, instrument_code: &str) -> bool {
        !self.transfer_fee_prefix.is_empty() && instrument_code.starts_with(&self.transfer_fee_prefix)
    }

    /// Per-unit-of-notional cost used when sizing a buy:
    /// `commission_rate + transfer_fee_rate`.
    pub fn sizing_rate(&self) -> f64 {
        self.commission_rate + self.transfer_fee_rate
    }

    pub fn breakdown(
        &self,
        price: f64,
        shares: u64,
        side: TradeSide,
        instrument_code: &str,
    ) -> FeeBreakdown {
        if shares == 0 {
            return FeeBreakdown::default();
        }
        let notional = price * shares as f64;

        let mut commission = notional * self.commission_rate;
        if self.use_commission_floor {
            commission = commission.max(self.min_commission);
        }

        let stamp_tax = match side {
            TradeSide::Buy => 0.0,
            TradeSide::Sell => notional * self.stamp_tax_rate,
        };

        let transfer_fee = if self.applies_transfer_fee(instrument_code) {
            shares as f64 * self.transfer_fee_rate
        } else {
            0.0
        };

        FeeBreakdown {
            commission: commission.max(0.0),
            stamp_tax: stamp_tax.max(0.0),
            transfer_fee: transfer_fee.max(0.0),
        }
    }

    /// Total fees for one trade.
    pub fn fees(&self, price: f64, shares: u64, side: TradeSide, instrument_code: &str) -> f64 {
        self.breakdown(price, shares, side, instrument_code).total()
    }
}

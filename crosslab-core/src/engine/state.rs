//! Engine configuration, mutable state, and run result types.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, PortfolioSnapshot, PositionState, Trade};
use crate::engine::fees::FeeSchedule;
use crate::error::ConfigError;
use chrono::NaiveDate;

/// Which price of the bar a trade fills at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPrice {
    #[default]
    Open,
    Close,
}

impl ExecutionPrice {
    pub fn of(self, bar: &Bar) -> f64 {
        match self {
            ExecutionPrice::Open => bar.open,
            ExecutionPrice::Close => bar.close,
        }
    }
}

/// Configuration for a single simulation run.
///
/// The historical engine variants (fee floor or not, open or close fills,
/// limit guards or not, halt handling or not) are all toggles on this one
/// struct. `canonical` is the complete variant; `simple` reproduces the
/// stripped-down one for side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Instrument code, e.g. `sh.600000`. Drives the transfer-fee rule.
    pub instrument_code: String,
    pub fees: FeeSchedule,
    /// Minimum tradable share increment.
    pub lot_size: u64,
    pub execution_price: ExecutionPrice,
    /// Refuse buys at limit-up and sells at limit-down.
    pub enforce_price_limits: bool,
    pub limit_up_pct: f64,
    pub limit_down_pct: f64,
    /// Price grid for rounding limit prices. `None` compares against the
    /// exact `prev_close * (1 ± pct)`.
    #[serde(default)]
    pub price_tick: Option<f64>,
    /// Zero-volume bars: no trading, valued at the previous close.
    pub skip_halted_bars: bool,
}

impl EngineConfig {
    /// Open-price fills, ±10% limit guards, halt skipping, 5.0 commission floor.
    pub fn canonical(initial_capital: f64, instrument_code: impl Into<String>) -> Self {
        Self {
            initial_capital,
            instrument_code: instrument_code.into(),
            fees: FeeSchedule::default(),
            lot_size: 100,
            execution_price: ExecutionPrice::Open,
            enforce_price_limits: true,
            limit_up_pct: 0.10,
            limit_down_pct: 0.10,
            price_tick: None,
            skip_halted_bars: true,
        }
    }

    /// Close-price fills, no limit guards, no halt skipping, no commission floor.
    pub fn simple(initial_capital: f64, instrument_code: impl Into<String>) -> Self {
        Self {
            fees: FeeSchedule::without_floor(),
            execution_price: ExecutionPrice::Close,
            enforce_price_limits: false,
            skip_halted_bars: false,
            ..Self::canonical(initial_capital, instrument_code)
        }
    }

    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if self.lot_size == 0 {
            return Err(ConfigError::ZeroLotSize);
        }
        if let Some(tick) = self.price_tick {
            if !tick.is_finite() || tick <= 0.0 {
                return Err(ConfigError::InvalidPriceTick(tick));
            }
        }
        for (name, value) in [
            ("limit_up_pct", self.limit_up_pct),
            ("limit_down_pct", self.limit_down_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        self.fees.validate()
    }
}

/// Counters for bars where a signal could not be acted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDiagnostics {
    pub halted_bars: usize,
    pub limit_up_blocks: usize,
    pub limit_down_blocks: usize,
    /// Buy signals where not even one lot was affordable.
    pub unaffordable_buys: usize,
    /// Sell signals whose fees exceeded proceeds plus cash on hand.
    pub unaffordable_sells: usize,
}

impl RunDiagnostics {
    /// Bars where a signal or the whole bar was skipped, for any reason.
    pub fn total_skipped(&self) -> usize {
        self.halted_bars
            + self.limit_up_blocks
            + self.limit_down_blocks
            + self.unaffordable_buys
            + self.unaffordable_sells
    }
}

/// Mutable state that evolves bar-by-bar during one run.
///
/// Owned by the loop runner and never handed out; callers only see the
/// `SimulationResult` it turns into.
#[derive(Debug)]
pub(crate) struct EngineState {
    pub position: PositionState,
    /// Close of the last bar that traded. Used as the limit reference and to
    /// mark the position through halts.
    pub reference_close: Option<f64>,
    pub trades: Vec<Trade>,
    pub snapshots: Vec<PortfolioSnapshot>,
    pub diagnostics: RunDiagnostics,
}

impl EngineState {
    pub fn new(initial_capital: f64, bar_count: usize) -> Self {
        Self {
            position: PositionState::new(initial_capital),
            reference_close: None,
            trades: Vec::new(),
            snapshots: Vec::with_capacity(bar_count),
            diagnostics: RunDiagnostics::default(),
        }
    }

    pub fn record_snapshot(&mut self, date: NaiveDate, mark_price: f64) {
        self.snapshots
            .push(PortfolioSnapshot::capture(date, &self.position, mark_price));
    }

    pub fn finish(self) -> SimulationResult {
        SimulationResult {
            snapshots: self.snapshots,
            trades: self.trades,
            diagnostics: self.diagnostics,
            final_position: self.position,
        }
    }
}

/// Output of a completed run: one snapshot per bar plus the trade log.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    snapshots: Vec<PortfolioSnapshot>,
    trades: Vec<Trade>,
    diagnostics: RunDiagnostics,
    final_position: PositionState,
}

impl SimulationResult {
    pub fn snapshots(&self) -> &[PortfolioSnapshot] {
        &self.snapshots
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn diagnostics(&self) -> RunDiagnostics {
        self.diagnostics
    }

    pub fn final_position(&self) -> &PositionState {
        &self.final_position
    }

    /// Total portfolio value at each bar.
    pub fn equity_curve(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.total_value).collect()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.snapshots.last().map(|s| s.total_value)
    }

    pub fn total_fees(&self) -> f64 {
        self.trades.iter().map(|t| t.fees).sum()
    }

    pub fn into_parts(self) -> (Vec<PortfolioSnapshot>, Vec<Trade>, RunDiagnostics) {
        (self.snapshots, self.trades, self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_preset() {
        let cfg = EngineConfig::canonical(100_000.0, "sh.600000");
        assert_eq!(cfg.execution_price, ExecutionPrice::Open);
        assert!(cfg.enforce_price_limits);
        assert!(cfg.skip_halted_bars);
        assert!(cfg.fees.use_commission_floor);
        assert_eq!(cfg.lot_size, 100);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn simple_preset_turns_everything_off() {
        let cfg = EngineConfig::simple(100_000.0, "sh.600000");
        assert_eq!(cfg.execution_price, ExecutionPrice::Close);
        assert!(!cfg.enforce_price_limits);
        assert!(!cfg.skip_halted_bars);
        assert!(!cfg.fees.use_commission_floor);
        assert_eq!(cfg.fees.commission_rate, 0.0003);
    }

    #[test]
    fn non_positive_capital_rejected() {
        let cfg = EngineConfig::canonical(0.0, "sh.600000");
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositiveCapital(0.0)));
        let cfg = EngineConfig::canonical(-5.0, "sh.600000");
        assert!(cfg.validate().is_err());
        let cfg = EngineConfig::canonical(f64::NAN, "sh.600000");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_lot_and_bad_tick_rejected() {
        let mut cfg = EngineConfig::canonical(1_000.0, "sz.000001");
        cfg.lot_size = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroLotSize));

        let mut cfg = EngineConfig::canonical(1_000.0, "sz.000001");
        cfg.price_tick = Some(0.0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidPriceTick(_))
        ));
    }

    #[test]
    fn execution_price_picks_field() {
        let bar = Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 10.0,
            high: None,
            low: None,
            close: 10.4,
            volume: 1.0,
            signal: crate::domain::Signal::Hold,
        };
        assert_eq!(ExecutionPrice::Open.of(&bar), 10.0);
        assert_eq!(ExecutionPrice::Close.of(&bar), 10.4);
    }
}

//! Bar-by-bar simulation loop — the heart of the backtesting engine.
//!
//! Per bar, in order:
//! 1. Halt check: a zero-volume bar (when halt skipping is on) trades nothing
//!    and is marked at the previous close.
//! 2. Signal: `Buy` while flat opens a position, `Sell` while long closes it,
//!    subject to the price-limit guards. Anything else is a no-op.
//! 3. Snapshot: cash, shares and value at the bar's close.
//!
//! Exactly one snapshot is recorded per bar on every path.

use tracing::{debug, info, info_span};

use crate::domain::{Bar, PositionSide, Signal, Trade, TradeSide};
use crate::error::EngineError;

use super::limits::{blocks_buy, blocks_sell};
use super::sizing::affordable_shares;
use super::state::{EngineConfig, EngineState, SimulationResult};
use super::validate::validate_bars;

/// A configured single-instrument, long-only simulation.
///
/// Holds only immutable configuration, so one `Simulation` can replay any
/// number of bar sequences, each with its own fresh state.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: EngineConfig,
}

impl Simulation {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replay `bars` from the initial capital.
    ///
    /// Fails before producing anything if the bars break the input contract.
    pub fn run(&self, bars: &[Bar]) -> Result<SimulationResult, EngineError> {
        validate_bars(bars)?;

        let _span = info_span!(
            "simulation",
            instrument = %self.config.instrument_code,
            bars = bars.len()
        )
        .entered();

        let mut state = EngineState::new(self.config.initial_capital, bars.len());
        for bar in bars {
            self.step(&mut state, bar);
        }

        let result = state.finish();
        info!(
            trades = result.trades().len(),
            final_value = result.final_value().unwrap_or(self.config.initial_capital),
            halted_bars = result.diagnostics().halted_bars,
            "simulation complete"
        );
        Ok(result)
    }

    fn step(&self, state: &mut EngineState, bar: &Bar) {
        if self.config.skip_halted_bars && bar.is_halted() {
            state.diagnostics.halted_bars += 1;
            // No earlier close exists only on the first bar, where the
            // position is necessarily flat and the mark price is unused.
            let mark = state.reference_close.unwrap_or(bar.close);
            state.record_snapshot(bar.date, mark);
            return;
        }

        match (bar.signal, state.position.side()) {
            (Signal::Buy, PositionSide::Flat) => self.try_buy(state, bar),
            (Signal::Sell, PositionSide::Long) => self.try_sell(state, bar),
            _ => {}
        }

        state.record_snapshot(bar.date, bar.close);
        state.reference_close = Some(bar.close);
    }

    fn try_buy(&self, state: &mut EngineState, bar: &Bar) {
        let cfg = &self.config;
        let price = cfg.execution_price.of(bar);

        if cfg.enforce_price_limits {
            if let Some(prev_close) = state.reference_close {
                if blocks_buy(price, prev_close, cfg.limit_up_pct, cfg.price_tick) {
                    state.diagnostics.limit_up_blocks += 1;
                    debug!(date = %bar.date, price, prev_close, "buy blocked at limit-up");
                    return;
                }
            }
        }

        let shares = affordable_shares(
            state.position.cash,
            price,
            &cfg.fees,
            cfg.lot_size,
            &cfg.instrument_code,
        );
        if shares == 0 {
            state.diagnostics.unaffordable_buys += 1;
            debug!(date = %bar.date, price, cash = state.position.cash, "buy signal but no lot affordable");
            return;
        }

        let fees = cfg
            .fees
            .fees(price, shares, TradeSide::Buy, &cfg.instrument_code);
        state.position.cash -= price * shares as f64 + fees;
        state.position.shares = shares;
        state
            .trades
            .push(Trade::new(bar.date, TradeSide::Buy, price, shares, fees));
        debug!(date = %bar.date, price, shares, fees, cash = state.position.cash, "buy filled");
    }

    fn try_sell(&self, state: &mut EngineState, bar: &Bar) {
        let cfg = &self.config;
        let price = cfg.execution_price.of(bar);

        if cfg.enforce_price_limits {
            if let Some(prev_close) = state.reference_close {
                if blocks_sell(price, prev_close, cfg.limit_down_pct, cfg.price_tick) {
                    state.diagnostics.limit_down_blocks += 1;
                    debug!(date = %bar.date, price, prev_close, "sell blocked at limit-down");
                    return;
                }
            }
        }

        let shares = state.position.shares;
        let fees = cfg
            .fees
            .fees(price, shares, TradeSide::Sell, &cfg.instrument_code);
        let proceeds = price * shares as f64 - fees;
        // A fee floor larger than the notional can make an exit cost money;
        // hold instead of letting cash go negative.
        if state.position.cash + proceeds < 0.0 {
            state.diagnostics.unaffordable_sells += 1;
            debug!(date = %bar.date, price, shares, fees, cash = state.position.cash, "sell skipped, fees exceed proceeds and cash");
            return;
        }
        state.position.cash += proceeds;
        state.position.shares = 0;
        state
            .trades
            .push(Trade::new(bar.date, TradeSide::Sell, price, shares, fees));
        debug!(date = %bar.date, price, shares, fees, cash = state.position.cash, "sell filled");
    }
}

/// Validate `config` and replay `bars` once.
pub fn run_simulation(bars: &[Bar], config: &EngineConfig) -> Result<SimulationResult, EngineError> {
    Simulation::new(config.clone())?.run(bars)
}

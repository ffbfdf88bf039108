//! CrossLab Core — domain types, fee model, simulation engine, crossover signals.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, signals, trades, position state, portfolio snapshots)
//! - Fee model (commission with floor, sell-side stamp tax, exchange transfer fee)
//! - Day-by-day FLAT/LONG simulation with lot sizing, price limits and halt handling
//! - SMA indicator and moving-average crossover signal stamping

pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod signals;

pub use error::{ConfigError, DataError, EngineError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types are Send + Sync so independent runs can
    /// be farmed out to worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::RawBar>();
        require_sync::<domain::RawBar>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::PortfolioSnapshot>();
        require_sync::<domain::PortfolioSnapshot>();

        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::Simulation>();
        require_sync::<engine::Simulation>();
        require_send::<engine::SimulationResult>();
        require_sync::<engine::SimulationResult>();

        require_send::<signals::MaCrossover>();
        require_sync::<signals::MaCrossover>();
        require_send::<EngineError>();
        require_sync::<EngineError>();
    }

    /// Architecture contract: the crossover signal sees prices only.
    #[test]
    fn signal_stamping_has_no_portfolio_parameter() {
        fn _check(sig: &signals::MaCrossover, raw: &[domain::RawBar]) -> Vec<domain::Bar> {
            sig.stamp(raw)
        }
    }
}

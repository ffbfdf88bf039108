//! Signal generation — stamps each bar with a buy/sell/hold instruction.
//!
//! Signals depend on market data only, never on portfolio state; the engine
//! decides whether a signal can actually be acted on.

pub mod ma_crossover;

pub use ma_crossover::MaCrossover;

//! Simulation engine — day-by-day replay of signaled bars.
//!
//! The engine consumes a validated `&[Bar]` (each bar already carrying its
//! signal) and an `EngineConfig`, and produces one `PortfolioSnapshot` per bar
//! plus an append-only trade log. Components:
//!
//! - `fees`: commission / stamp tax / transfer fee for one trade
//! - `sizing`: whole-lot buy sizing that never overdraws cash
//! - `limits`: limit-up / limit-down guards
//! - `validate`: input contract checks
//! - `loop_runner`: the FLAT/LONG state machine

pub mod fees;
pub mod limits;
pub mod loop_runner;
pub mod sizing;
pub mod state;
pub mod validate;

pub use fees::{FeeBreakdown, FeeSchedule};
pub use loop_runner::{run_simulation, Simulation};
pub use sizing::{affordable_shares, buy_cost};
pub use state::{EngineConfig, ExecutionPrice, RunDiagnostics, SimulationResult};
pub use validate::validate_bars;

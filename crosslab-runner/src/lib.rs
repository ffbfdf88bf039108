//! CrossLab Runner — backtest orchestration on top of `crosslab-core`.
//!
//! This crate provides:
//! - TOML configuration with defaults for every key
//! - Bar loading from CSV, with a synthetic fallback for development
//! - Single-backtest runner: signal stamping, simulation, metrics
//! - Performance metrics (total/annualized return, Sharpe, max drawdown)
//! - Parallel parameter sweeps over crossover windows
//! - JSON/CSV/Markdown artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigFileError, EnginePreset};
pub use data_loader::{load_bars, DataSource, LoadError, LoadedBars};
pub use metrics::{MetricsError, MetricsSettings, PerformanceMetrics};
pub use runner::{run_backtest_from_bars, run_single_backtest, BacktestResult, RunError};
pub use sweep::{run_sweep, ParamGrid, SweepEntry, SweepResults};

//! Backtest runner — wires together data loading, signals, engine and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads bars per the config, then runs. Used by the CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars. Used by parameter sweeps
//!   so the CSV is read once for the whole grid.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span};

use crosslab_core::domain::{PortfolioSnapshot, Signal, Trade};
use crosslab_core::engine::{EngineConfig, RunDiagnostics, Simulation};
use crosslab_core::error::{ConfigError, EngineError};

use crate::config::{BacktestConfig, ConfigFileError, EnginePreset};
use crate::data_loader::{load_bars, DataSource, LoadError, LoadedBars};
use crate::metrics::{MetricsError, PerformanceMetrics};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigFileError),
    #[error("strategy error: {0}")]
    Strategy(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub instrument_code: String,
    pub strategy: String,
    pub short_window: usize,
    pub long_window: usize,
    pub preset: EnginePreset,
    /// First and last bar actually replayed.
    pub start_date: String,
    pub end_date: String,
    pub initial_capital: f64,
    pub dataset_hash: String,
    pub data_source: DataSource,
    pub has_synthetic: bool,
    pub bar_count: usize,
    /// Bars carrying a buy or sell signal, whether or not it filled.
    pub signal_count: usize,
    pub engine: EngineConfig,
    pub metrics: PerformanceMetrics,
    pub diagnostics: RunDiagnostics,
    pub trades: Vec<Trade>,
    pub snapshots: Vec<PortfolioSnapshot>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn equity_curve(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.total_value).collect()
    }

    pub fn final_value(&self) -> f64 {
        self.snapshots
            .last()
            .map_or(self.initial_capital, |s| s.total_value)
    }
}

/// Run a single backtest from a config, loading bars from its data source.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let b = &config.backtest;
    let loaded = load_bars(&config.data, &b.instrument_code, b.start_date, b.end_date)?;
    run_backtest_from_bars(config, &loaded)
}

/// Run a backtest on pre-loaded bars — no I/O.
pub fn run_backtest_from_bars(
    config: &BacktestConfig,
    loaded: &LoadedBars,
) -> Result<BacktestResult, RunError> {
    let crossover = config.crossover()?;
    let engine_config = config.to_engine_config();

    let _span = info_span!(
        "backtest",
        code = %engine_config.instrument_code,
        short = crossover.short_window(),
        long = crossover.long_window()
    )
    .entered();

    let bars = crossover.stamp(&loaded.bars);
    let signal_count = bars.iter().filter(|b| b.signal != Signal::Hold).count();

    let simulation = Simulation::new(engine_config)?;
    let result = simulation.run(&bars)?;

    let metrics = PerformanceMetrics::compute(
        &result.equity_curve(),
        result.trades(),
        &config.metrics,
    )?;
    info!(
        total_return = metrics.total_return,
        max_drawdown = metrics.max_drawdown,
        trades = result.trades().len(),
        "backtest complete"
    );

    let start_date = bars.first().map(|b| b.date.to_string()).unwrap_or_default();
    let end_date = bars.last().map(|b| b.date.to_string()).unwrap_or_default();
    let (snapshots, trades, diagnostics) = result.into_parts();

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id()?,
        instrument_code: config.backtest.instrument_code.clone(),
        strategy: crossover.name(),
        short_window: crossover.short_window(),
        long_window: crossover.long_window(),
        preset: config.backtest.preset,
        start_date,
        end_date,
        initial_capital: config.backtest.initial_capital,
        dataset_hash: loaded.dataset_hash.clone(),
        data_source: loaded.source.clone(),
        has_synthetic: loaded.is_synthetic(),
        bar_count: bars.len(),
        signal_count,
        engine: simulation.config().clone(),
        metrics,
        diagnostics,
        trades,
        snapshots,
    })
}

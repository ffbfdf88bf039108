//! Parameter sweep over SMA crossover windows.
//!
//! Every (short, long) pair with `short < long` is backtested on the same
//! pre-loaded bars. Runs are independent and execute in parallel with rayon;
//! each owns its engine state and only reads the shared bars.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info_span;

use crate::config::BacktestConfig;
use crate::data_loader::LoadedBars;
use crate::metrics::PerformanceMetrics;
use crate::runner::{run_backtest_from_bars, RunError};

/// Parameter grid specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub short_windows: Vec<usize>,
    pub long_windows: Vec<usize>,
}

impl ParamGrid {
    /// Short windows 5, 10, 20, 30; long windows 40, 60, 90, 120.
    pub fn ma_crossover_default() -> Self {
        Self {
            short_windows: vec![5, 10, 20, 30],
            long_windows: vec![40, 60, 90, 120],
        }
    }

    /// Valid (short, long) pairs in grid order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for &short in &self.short_windows {
            for &long in &self.long_windows {
                // Skip invalid combinations (short >= long)
                if short == 0 || short >= long {
                    continue;
                }
                pairs.push((short, long));
            }
        }
        pairs
    }

    /// Number of valid pairs.
    pub fn size(&self) -> usize {
        self.pairs().len()
    }
}

/// Summary of one sweep run. Snapshots are dropped to keep sweeps small.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub short_window: usize,
    pub long_window: usize,
    pub final_value: f64,
    pub trade_count: usize,
    pub metrics: PerformanceMetrics,
}

/// All entries of a sweep, in grid order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResults {
    entries: Vec<SweepEntry>,
}

impl SweepResults {
    pub fn all(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by total return, best first.
    pub fn sorted_by_return(&self) -> Vec<&SweepEntry> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            b.metrics
                .total_return
                .partial_cmp(&a.metrics.total_return)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&SweepEntry> {
        self.sorted_by_return().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&SweepEntry> {
        self.sorted_by_return().into_iter().next()
    }

    /// One CSV row per entry.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        use anyhow::Context;

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record([
            "short_window",
            "long_window",
            "final_value",
            "total_return",
            "annualized_return",
            "sharpe",
            "max_drawdown",
            "trades",
        ])?;
        let opt = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();
        for e in &self.entries {
            wtr.write_record([
                e.short_window.to_string(),
                e.long_window.to_string(),
                format!("{:.2}", e.final_value),
                format!("{:.6}", e.metrics.total_return),
                opt(e.metrics.annualized_return),
                opt(e.metrics.sharpe),
                format!("{:.6}", e.metrics.max_drawdown),
                e.trade_count.to_string(),
            ])?;
        }
        let data = wtr.into_inner().context("failed to flush CSV writer")?;
        String::from_utf8(data).context("CSV output is not valid UTF-8")
    }
}

/// Backtest every grid pair on `loaded`, in parallel.
///
/// The first failing run aborts the sweep.
pub fn run_sweep(
    base: &BacktestConfig,
    loaded: &LoadedBars,
    grid: &ParamGrid,
) -> Result<SweepResults, RunError> {
    let pairs = grid.pairs();
    let _span = info_span!("sweep", runs = pairs.len()).entered();

    let entries = pairs
        .par_iter()
        .map(|&(short, long)| {
            let mut config = base.clone();
            config.strategy.short_window = short;
            config.strategy.long_window = long;
            let result = run_backtest_from_bars(&config, loaded)?;
            Ok(SweepEntry {
                short_window: short,
                long_window: long,
                final_value: result.final_value(),
                trade_count: result.trades.len(),
                metrics: result.metrics,
            })
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    Ok(SweepResults { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::{compute_dataset_hash, generate_synthetic_bars, DataSource};
    use chrono::NaiveDate;

    fn loaded() -> LoadedBars {
        let bars = generate_synthetic_bars(
            "sz.000001",
            NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
        );
        LoadedBars {
            dataset_hash: compute_dataset_hash(&bars),
            bars,
            source: DataSource::Synthetic,
        }
    }

    #[test]
    fn grid_skips_invalid_pairs() {
        let grid = ParamGrid {
            short_windows: vec![10, 50, 0],
            long_windows: vec![20, 50],
        };
        assert_eq!(grid.pairs(), vec![(10, 20), (10, 50)]);
        assert_eq!(grid.size(), 2);
    }

    #[test]
    fn default_grid_size() {
        assert_eq!(ParamGrid::ma_crossover_default().size(), 16);
    }

    #[test]
    fn sweep_runs_every_pair_in_order() {
        let grid = ParamGrid {
            short_windows: vec![5, 10],
            long_windows: vec![20, 40],
        };
        let results = run_sweep(&BacktestConfig::default(), &loaded(), &grid).unwrap();
        assert_eq!(results.len(), 4);
        let pairs: Vec<(usize, usize)> = results
            .all()
            .iter()
            .map(|e| (e.short_window, e.long_window))
            .collect();
        assert_eq!(pairs, grid.pairs());
    }

    #[test]
    fn sweep_matches_single_runs() {
        let grid = ParamGrid {
            short_windows: vec![5],
            long_windows: vec![20],
        };
        let data = loaded();
        let swept = run_sweep(&BacktestConfig::default(), &data, &grid).unwrap();

        let mut config = BacktestConfig::default();
        config.strategy.short_window = 5;
        config.strategy.long_window = 20;
        let single = run_backtest_from_bars(&config, &data).unwrap();

        assert_eq!(swept.all()[0].final_value, single.final_value());
        assert_eq!(swept.all()[0].metrics, single.metrics);
    }

    #[test]
    fn best_is_highest_return() {
        let results = run_sweep(
            &BacktestConfig::default(),
            &loaded(),
            &ParamGrid::ma_crossover_default(),
        )
        .unwrap();
        let best = results.best().unwrap();
        assert!(results
            .all()
            .iter()
            .all(|e| e.metrics.total_return <= best.metrics.total_return));
        assert_eq!(results.top_n(3).len(), 3);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let grid = ParamGrid {
            short_windows: vec![5],
            long_windows: vec![20, 40],
        };
        let csv = run_sweep(&BacktestConfig::default(), &loaded(), &grid)
            .unwrap()
            .to_csv()
            .unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("short_window,long_window,final_value"));
    }
}

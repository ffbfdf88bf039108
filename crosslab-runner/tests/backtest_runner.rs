//! Integration tests for the runner: config file → CSV bars → run → artifacts.
//!
//! Every test builds its own fixture in a temp dir, so nothing depends on
//! files checked into the repo.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use crosslab_core::domain::TradeSide;
use crosslab_runner::config::{BacktestConfig, EnginePreset};
use crosslab_runner::data_loader::DataSource;
use crosslab_runner::export::{load_artifacts, save_artifacts};
use crosslab_runner::runner::{run_single_backtest, RunError};
use crosslab_runner::LoadError;

const CODE: &str = "sh.600000";

/// Flat, dip, ramp, then a sharp fall: one golden cross and one death cross
/// for 3/8 windows.
fn closes() -> Vec<f64> {
    (0..60)
        .map(|i| match i {
            0..=9 => 10.0,
            10..=19 => 10.0 - (i - 9) as f64 * 0.05,
            20..=39 => 9.5 + (i - 19) as f64 * 0.08,
            _ => 11.1 - (i - 39) as f64 * 0.1,
        })
        .collect()
}

fn write_csv(dir: &Path) -> PathBuf {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut text = String::from("date,code,open,high,low,close,volume\n");
    for (i, close) in closes().iter().enumerate() {
        let date = start + chrono::Duration::days(i as i64);
        text.push_str(&format!(
            "{date},{CODE},{close:.2},{:.2},{:.2},{close:.2},1000000\n",
            close + 0.05,
            close - 0.05
        ));
    }
    // Another instrument in the same file must be ignored.
    text.push_str("2024-01-01,sz.000001,5.00,5.10,4.90,5.00,1000\n");

    let path = dir.join("bars.csv");
    std::fs::write(&path, text).unwrap();
    path
}

fn write_config(dir: &Path, csv: &Path, preset: &str) -> BacktestConfig {
    let text = format!(
        r#"
[backtest]
instrument_code = "{CODE}"
start_date = "2024-01-01"
end_date = "2024-12-31"
initial_capital = 100000.0
preset = "{preset}"

[strategy]
short_window = 3
long_window = 8

[data]
csv_path = "{}"
"#,
        csv.display().to_string().replace('\\', "/")
    );
    let path = dir.join("crosslab.toml");
    std::fs::write(&path, text).unwrap();
    BacktestConfig::from_file(&path).unwrap()
}

#[test]
fn csv_backtest_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());
    let config = write_config(dir.path(), &csv, "canonical");

    let result = run_single_backtest(&config).unwrap();

    assert_eq!(result.bar_count, 60);
    assert_eq!(result.snapshots.len(), 60);
    assert_eq!(result.start_date, "2024-01-01");
    assert_eq!(result.data_source, DataSource::Csv { path: csv.clone() });
    assert!(!result.has_synthetic);

    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.trades[0].side, TradeSide::Buy);
    assert_eq!(result.trades[1].side, TradeSide::Sell);
    assert_eq!(result.trades[0].shares % 100, 0);
    assert_eq!(result.snapshots.last().unwrap().shares, 0);

    assert_eq!(result.metrics.round_trips, 1);
    let fees: f64 = result.trades.iter().map(|t| t.fees).sum();
    assert!((result.metrics.total_fees - fees).abs() < 1e-9);
    assert!(result.metrics.max_drawdown >= 0.0);
}

#[test]
fn presets_change_execution_price() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());

    let canonical = run_single_backtest(&write_config(dir.path(), &csv, "canonical")).unwrap();
    let simple = run_single_backtest(&write_config(dir.path(), &csv, "simple")).unwrap();

    assert_eq!(simple.preset, EnginePreset::Simple);
    // Open equals close in the fixture, so fills coincide in price and date.
    assert_eq!(canonical.trades[0].date, simple.trades[0].date);
    assert_eq!(canonical.trades[0].price, simple.trades[0].price);
    // Only the fee floor differs; both runs are large enough to clear it.
    assert!((canonical.trades[0].fees - simple.trades[0].fees).abs() < 1e-9);
}

#[test]
fn artifacts_written_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());
    let config = write_config(dir.path(), &csv, "canonical");
    let result = run_single_backtest(&config).unwrap();

    let run_dir = save_artifacts(&result, &dir.path().join("out")).unwrap();
    for name in ["manifest.json", "portfolio.csv", "trades.csv", "report.md"] {
        assert!(run_dir.join(name).exists(), "missing {name}");
    }

    let portfolio = std::fs::read_to_string(run_dir.join("portfolio.csv")).unwrap();
    assert_eq!(portfolio.lines().count(), 61);

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.trades.len(), result.trades.len());
}

#[test]
fn missing_config_is_created_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("crosslab.toml");

    let (config, created) = BacktestConfig::load_or_create(&path).unwrap();
    assert!(created);
    assert!(path.exists());
    assert_eq!(config, BacktestConfig::default());

    let (again, created) = BacktestConfig::load_or_create(&path).unwrap();
    assert!(!created);
    assert_eq!(again, config);
}

#[test]
fn missing_csv_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &dir.path().join("nope.csv"), "canonical");
    let err = run_single_backtest(&config).unwrap_err();
    assert!(matches!(err, RunError::Data(LoadError::Io { .. })));
}

#[test]
fn date_window_outside_data_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());
    let mut config = write_config(dir.path(), &csv, "canonical");
    config.backtest.start_date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    config.backtest.end_date = NaiveDate::from_ymd_opt(2030, 12, 31).unwrap();
    let err = run_single_backtest(&config).unwrap_err();
    assert!(matches!(err, RunError::Data(LoadError::NoBarsInRange { .. })));
}

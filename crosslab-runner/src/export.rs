//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: daily portfolio snapshots and the trade log
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use crosslab_core::domain::{PortfolioSnapshot, Trade};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export daily snapshots as CSV.
///
/// Columns: date, cash, shares, mark_price, position_value, total_value
pub fn export_portfolio_csv(snapshots: &[PortfolioSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "cash",
        "shares",
        "mark_price",
        "position_value",
        "total_value",
    ])?;
    for s in snapshots {
        wtr.write_record([
            s.date.to_string(),
            format!("{:.2}", s.cash),
            s.shares.to_string(),
            format!("{:.2}", s.mark_price),
            format!("{:.2}", s.position_value),
            format!("{:.2}", s.total_value),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the trade log as CSV.
///
/// Columns: date, side, price, shares, value, fees
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "side", "price", "shares", "value", "fees"])?;
    for t in trades {
        wtr.write_record([
            t.date.to_string(),
            t.side.as_str().to_string(),
            format!("{:.2}", t.price),
            t.shares.to_string(),
            format!("{:.2}", t.value),
            format!("{:.4}", t.fees),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{code}_{short}x{long}_{timestamp}/` under
/// `output_dir` containing:
/// - `manifest.json` — the full `BacktestResult`
/// - `portfolio.csv` — one row per bar
/// - `trades.csv` — executed trades
/// - `report.md` — Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}x{}_{}",
        result.instrument_code.replace('.', "_"),
        result.short_window,
        result.long_window,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(
        run_dir.join("portfolio.csv"),
        export_portfolio_csv(&result.snapshots)?,
    )?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Instrument | {} |\n", result.instrument_code));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!("| Strategy | {} |\n", result.strategy));
    md.push_str(&format!("| Engine Preset | {:?} |\n", result.preset));
    md.push_str(&format!(
        "| Initial Capital | {:.2} |\n",
        result.initial_capital
    ));
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!("| Signals | {} |\n", result.signal_count));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    let m = &result.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Value | {:.2} |\n", result.final_value()));
    md.push_str(&format!(
        "| Total Return | {:.2}% |\n",
        m.total_return * 100.0
    ));
    md.push_str(&format!(
        "| Annualized Return | {} |\n",
        m.annualized_return
            .map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
    ));
    md.push_str(&format!(
        "| Sharpe | {} |\n",
        m.sharpe
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
    ));
    md.push_str(&format!(
        "| Max Drawdown | {:.2}% |\n",
        m.max_drawdown * 100.0
    ));
    md.push_str(&format!("| Round Trips | {} |\n", m.round_trips));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Total Fees | {:.2} |\n", m.total_fees));
    md.push('\n');

    let d = &result.diagnostics;
    if d.total_skipped() > 0 {
        md.push_str("## Skipped Signals\n\n");
        md.push_str("| Reason | Count |\n");
        md.push_str("| --- | ---: |\n");
        md.push_str(&format!("| Halted bars | {} |\n", d.halted_bars));
        md.push_str(&format!("| Limit-up blocks | {} |\n", d.limit_up_blocks));
        md.push_str(&format!("| Limit-down blocks | {} |\n", d.limit_down_blocks));
        md.push_str(&format!("| Unaffordable buys | {} |\n", d.unaffordable_buys));
        md.push_str(&format!("| Unaffordable sells | {} |\n", d.unaffordable_sells));
        md.push('\n');
    }

    if !result.trades.is_empty() {
        md.push_str("## Trades\n\n");
        md.push_str("| Date | Side | Price | Shares | Fees |\n");
        md.push_str("| --- | --- | ---: | ---: | ---: |\n");
        for t in &result.trades {
            md.push_str(&format!(
                "| {} | {} | {:.2} | {} | {:.2} |\n",
                t.date,
                t.side.as_str(),
                t.price,
                t.shares,
                t.fees
            ));
        }
        md.push('\n');
    }

    md
}

//! CrossLab CLI — run, sweep and config commands.
//!
//! Commands:
//! - `run` — execute one SMA crossover backtest from a TOML config, with
//!   optional command-line overrides, and save the artifact set
//! - `sweep` — backtest a grid of (short, long) windows in parallel
//! - `init-config` — write a config file populated with every default
//!
//! Logging goes to stderr through `tracing`; set `CROSSLAB_LOG` to change the
//! filter (e.g. `CROSSLAB_LOG=debug` to see every fill and skipped signal).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use crosslab_runner::export::save_artifacts;
use crosslab_runner::runner::{run_backtest_from_bars, run_single_backtest};
use crosslab_runner::{
    load_bars, run_sweep, BacktestConfig, BacktestResult, EnginePreset, ParamGrid, SweepResults,
};

#[derive(Parser)]
#[command(
    name = "crosslab",
    about = "CrossLab CLI — SMA crossover backtester for lot-traded equities"
)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    Canonical,
    Simple,
}

impl From<PresetArg> for EnginePreset {
    fn from(p: PresetArg) -> Self {
        match p {
            PresetArg::Canonical => EnginePreset::Canonical,
            PresetArg::Simple => EnginePreset::Simple,
        }
    }
}

/// Overrides shared by `run` and `sweep`; each one replaces the config value.
#[derive(Args, Debug, Default)]
struct ConfigOverrides {
    /// Instrument code (e.g., sh.600000).
    #[arg(long)]
    code: Option<String>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD).
    #[arg(long)]
    end: Option<String>,

    /// Initial capital.
    #[arg(long)]
    capital: Option<f64>,

    /// Engine preset.
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// CSV file with date,code,open,high,low,close,volume columns.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Use synthetic data when no CSV is given.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to the TOML config file. Created with defaults if missing.
        #[arg(long, default_value = "crosslab.toml")]
        config: PathBuf,

        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Short SMA window.
        #[arg(long)]
        short: Option<usize>,

        /// Long SMA window.
        #[arg(long)]
        long: Option<usize>,

        /// Output directory for artifacts. Defaults to the config's output.dir.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,
    },
    /// Backtest every (short, long) window pair on the same bars.
    Sweep {
        /// Path to the TOML config file.
        #[arg(long, default_value = "crosslab.toml")]
        config: PathBuf,

        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Short windows, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![5, 10, 20, 30])]
        short: Vec<usize>,

        /// Long windows, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![40, 60, 90, 120])]
        long: Vec<usize>,

        /// Number of best results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Write the full sweep table as CSV.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a config file with every default filled in.
    InitConfig {
        /// Destination path.
        #[arg(long, default_value = "crosslab.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Commands::Run {
            config,
            overrides,
            short,
            long,
            output_dir,
            no_artifacts,
        } => run_backtest_cmd(&config, &overrides, short, long, output_dir, no_artifacts),
        Commands::Sweep {
            config,
            overrides,
            short,
            long,
            top,
            output,
        } => run_sweep_cmd(&config, &overrides, short, long, top, output),
        Commands::InitConfig { path, force } => run_init_config(&path, force),
    }
}

/// Install the global subscriber. `CROSSLAB_LOG` holds the filter, default `info`.
fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = std::env::var("CROSSLAB_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| anyhow::anyhow!("invalid log filter: {err}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<BacktestConfig> {
    let (mut config, created) = BacktestConfig::load_or_create(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    if created {
        println!("Config file {} not found; created it with defaults.", path.display());
    }
    apply_overrides(&mut config, overrides)?;
    Ok(config)
}

fn apply_overrides(config: &mut BacktestConfig, o: &ConfigOverrides) -> Result<()> {
    if let Some(code) = &o.code {
        config.backtest.instrument_code = code.clone();
    }
    if let Some(start) = &o.start {
        config.backtest.start_date = parse_date(start)?;
    }
    if let Some(end) = &o.end {
        config.backtest.end_date = parse_date(end)?;
    }
    if let Some(capital) = o.capital {
        config.backtest.initial_capital = capital;
    }
    if let Some(preset) = o.preset {
        config.backtest.preset = preset.into();
    }
    if let Some(csv) = &o.csv {
        config.data.csv_path = Some(csv.clone());
    }
    if o.synthetic {
        config.data.synthetic = true;
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_backtest_cmd(
    config_path: &Path,
    overrides: &ConfigOverrides,
    short: Option<usize>,
    long: Option<usize>,
    output_dir: Option<PathBuf>,
    no_artifacts: bool,
) -> Result<()> {
    let mut config = load_config(config_path, overrides)?;
    if let Some(short) = short {
        config.strategy.short_window = short;
    }
    if let Some(long) = long {
        config.strategy.long_window = long;
    }

    let result = run_single_backtest(&config)?;
    print_summary(&result);

    if !no_artifacts {
        let dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
        let run_dir = save_artifacts(&result, &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_sweep_cmd(
    config_path: &Path,
    overrides: &ConfigOverrides,
    short: Vec<usize>,
    long: Vec<usize>,
    top: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let grid = ParamGrid {
        short_windows: short,
        long_windows: long,
    };
    if grid.size() == 0 {
        bail!("parameter grid has no valid (short < long) pairs");
    }

    let b = &config.backtest;
    let loaded = load_bars(&config.data, &b.instrument_code, b.start_date, b.end_date)?;

    // Fail on a bad base config once, before fanning out.
    run_backtest_from_bars(&config, &loaded)?;
    info!(runs = grid.size(), "starting sweep");
    let results = run_sweep(&config, &loaded, &grid)?;

    print_sweep(&results, top);
    if let Some(path) = output {
        std::fs::write(&path, results.to_csv()?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Sweep table saved to: {}", path.display());
    }
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    BacktestConfig::default().save(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn pct(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Instrument:     {}", result.instrument_code);
    println!(
        "Period:         {} to {}",
        result.start_date, result.end_date
    );
    println!("Strategy:       {}", result.strategy);
    println!("Bars:           {}", result.bar_count);
    println!("Signals:        {}", result.signal_count);
    println!("Trades:         {}", result.trades.len());
    println!();
    println!("--- Performance ---");
    println!("Final Value:    {:.2}", result.final_value());
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Annual Return:  {}", pct(m.annualized_return));
    println!(
        "Sharpe:         {}",
        m.sharpe
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
    );
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Total Fees:     {:.2}", m.total_fees);

    let d = &result.diagnostics;
    if d.total_skipped() > 0 {
        println!();
        println!("--- Skipped ---");
        println!("Halted bars:    {}", d.halted_bars);
        println!("Limit-up:       {}", d.limit_up_blocks);
        println!("Limit-down:     {}", d.limit_down_blocks);
        println!("Unaffordable:   {} buys, {} sells", d.unaffordable_buys, d.unaffordable_sells);
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_sweep(results: &SweepResults, top: usize) {
    println!();
    println!("=== Sweep: {} runs ===", results.len());
    println!(
        "{:>6} {:>6} {:>14} {:>10} {:>10} {:>8} {:>8}",
        "Short", "Long", "Final Value", "Return", "Annual", "Sharpe", "MaxDD"
    );
    println!("{}", "-".repeat(68));
    for e in results.top_n(top) {
        let m = &e.metrics;
        println!(
            "{:>6} {:>6} {:>14.2} {:>9.2}% {:>10} {:>8} {:>7.2}%",
            e.short_window,
            e.long_window,
            e.final_value,
            m.total_return * 100.0,
            pct(m.annualized_return),
            m.sharpe.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}")),
            m.max_drawdown * 100.0
        );
    }
}

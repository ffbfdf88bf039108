//! Bar loading for the runner.
//!
//! Bars come from one of two sources:
//! 1. A CSV file with a `date,code,open,high,low,close,volume` header (extra
//!    columns are ignored, `high`/`low` may be empty)
//! 2. Synthetic bars, when enabled and no CSV is configured
//!
//! Synthetic data is a developer-only debug mode. Results produced on
//! synthetic data are tagged as such in the manifest and report.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crosslab_core::domain::RawBar;

use crate::config::DataSection;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no bars for '{code}' between {start} and {end}")]
    NoBarsInRange {
        code: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("no data source configured (set data.csv_path or enable data.synthetic)")]
    NoDataSource,
}

/// Where a run's bars came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSource {
    Csv { path: PathBuf },
    Synthetic,
}

/// Result of loading bars, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    /// Date-sorted bars for one instrument.
    pub bars: Vec<RawBar>,
    pub source: DataSource,
    /// BLAKE3 hash over all bar data, for fingerprinting.
    pub dataset_hash: String,
}

impl LoadedBars {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    code: String,
    open: f64,
    high: Option<f64>,
    low: Option<f64>,
    close: f64,
    volume: Option<f64>,
}

/// Load bars for `code` in `[start, end]` from the configured source.
pub fn load_bars(
    data: &DataSection,
    code: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<LoadedBars, LoadError> {
    let (bars, source) = match (&data.csv_path, data.synthetic) {
        (Some(path), _) => (
            load_csv(path, code, start, end)?,
            DataSource::Csv { path: path.clone() },
        ),
        (None, true) => {
            warn!(code, "generating synthetic data; results will be tagged as synthetic");
            (generate_synthetic_bars(code, start, end), DataSource::Synthetic)
        }
        (None, false) => return Err(LoadError::NoDataSource),
    };

    if bars.is_empty() {
        return Err(LoadError::NoBarsInRange {
            code: code.to_string(),
            start,
            end,
        });
    }

    let dataset_hash = compute_dataset_hash(&bars);
    info!(code, bars = bars.len(), hash = %&dataset_hash[..12], "bars loaded");
    Ok(LoadedBars {
        bars,
        source,
        dataset_hash,
    })
}

/// Read a CSV file, keeping rows for `code` dated within `[start, end]`.
pub fn load_csv(
    path: &Path,
    code: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RawBar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(file, code, start, end)
}

/// Parse CSV bar data from any reader. Output is sorted by date.
///
/// An empty volume field reads as zero volume (a halted session).
pub fn parse_csv<R: Read>(
    reader: R,
    code: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RawBar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();

    for row in rdr.deserialize() {
        let row: CsvRow = row?;
        if row.code != code || row.date < start || row.date > end {
            continue;
        }
        bars.push(RawBar {
            date: row.date,
            code: row.code,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.unwrap_or(0.0),
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

/// Compute a deterministic BLAKE3 hash over all bar data.
pub fn compute_dataset_hash(bars: &[RawBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.code.as_bytes());
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.unwrap_or(f64::NAN).to_le_bytes());
        hasher.update(&bar.low.unwrap_or(f64::NAN).to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic bars for testing/development.
///
/// A random walk from 10.00 with daily moves inside ±3%, prices rounded to
/// 0.01 and roughly one halted (zero-volume) session in a hundred. The seed is
/// derived from the instrument code, so the same code always gets the same bars.
pub fn generate_synthetic_bars(code: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(code.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let round = |p: f64| (p * 100.0).round() / 100.0;

    let mut bars = Vec::new();
    let mut price = 10.0_f64;
    let mut current = start;

    while current <= end {
        // Skip weekends (simple heuristic)
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let gap: f64 = rng.gen_range(-0.01..0.01);
        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = round(price * (1.0 + gap)).max(0.01);
        let close = round(price * (1.0 + daily_return)).max(0.01);
        let high = round(open.max(close) * (1.0 + rng.gen_range(0.0..0.01)));
        let low = round(open.min(close) * (1.0 - rng.gen_range(0.0..0.01))).max(0.01);
        let halted = rng.gen_bool(0.01);
        let volume = if halted {
            0.0
        } else {
            rng.gen_range(500_000.0..5_000_000.0_f64).round()
        };

        bars.push(RawBar {
            date: current,
            code: code.to_string(),
            open,
            high: Some(high),
            low: Some(low),
            close: if halted { price } else { close },
            volume,
        });

        if !halted {
            price = close;
        }
        current += chrono::Duration::days(1);
    }

    bars
}

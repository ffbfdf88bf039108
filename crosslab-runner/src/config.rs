//! Serializable backtest configuration, read from a TOML file.
//!
//! Every key has a default, so a partial file (or an empty one) is valid.
//! A missing file can be created with the defaults by `load_or_create`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crosslab_core::engine::{EngineConfig, ExecutionPrice, FeeSchedule};
use crosslab_core::error::ConfigError;
use crosslab_core::signals::MaCrossover;

use crate::metrics::MetricsSettings;

/// Errors from reading, writing or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Named engine behaviour bundle; individual `[engine]` keys override it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePreset {
    /// Next-open execution, price limits, halt skipping, commission floor.
    #[default]
    Canonical,
    /// Close execution, no limits, no halt skipping, no commission floor.
    Simple,
}

/// `[backtest]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub instrument_code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub preset: EnginePreset,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            instrument_code: "sh.600000".into(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            initial_capital: 100_000.0,
            preset: EnginePreset::Canonical,
        }
    }
}

/// `[strategy]` section: SMA crossover windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 60,
        }
    }
}

/// `[engine]` section: per-key overrides of the chosen preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_price: Option<ExecutionPrice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforce_price_limits: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_up_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_down_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_tick: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_halted_bars: Option<bool>,
}

/// `[data]` section: where bars come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// CSV file with `date,code,open,high,low,close,volume` columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<PathBuf>,
    /// Generate a deterministic random walk when no CSV is given.
    pub synthetic: bool,
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

/// Complete configuration for one backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
    /// Fee schedule; omitted keys take the reference defaults. When the whole
    /// section is absent the preset's schedule is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<FeeSchedule>,
    pub engine: EngineOverrides,
    pub data: DataSection,
    pub output: OutputSection,
    pub metrics: MetricsSettings,
}

impl BacktestConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path`, or write the default config there first if it does not exist.
    ///
    /// Returns the config and whether the file was created.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool), ConfigFileError> {
        if path.exists() {
            return Ok((Self::from_file(path)?, false));
        }
        let config = Self::default();
        config.save(path)?;
        info!(path = %path.display(), "config file not found, wrote defaults");
        Ok((config, true))
    }

    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigFileError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve preset, fee section and overrides into an engine config.
    pub fn to_engine_config(&self) -> EngineConfig {
        let b = &self.backtest;
        let mut cfg = match b.preset {
            EnginePreset::Canonical => {
                EngineConfig::canonical(b.initial_capital, b.instrument_code.clone())
            }
            EnginePreset::Simple => EngineConfig::simple(b.initial_capital, b.instrument_code.clone()),
        };
        if let Some(fees) = &self.fees {
            cfg.fees = fees.clone();
        }

        let o = &self.engine;
        if let Some(v) = o.execution_price {
            cfg.execution_price = v;
        }
        if let Some(v) = o.lot_size {
            cfg.lot_size = v;
        }
        if let Some(v) = o.enforce_price_limits {
            cfg.enforce_price_limits = v;
        }
        if let Some(v) = o.limit_up_pct {
            cfg.limit_up_pct = v;
        }
        if let Some(v) = o.limit_down_pct {
            cfg.limit_down_pct = v;
        }
        if let Some(v) = o.price_tick {
            cfg.price_tick = Some(v);
        }
        if let Some(v) = o.skip_halted_bars {
            cfg.skip_halted_bars = v;
        }
        cfg
    }

    /// Build the crossover signal for the configured windows.
    pub fn crossover(&self) -> Result<MaCrossover, ConfigError> {
        MaCrossover::new(self.strategy.short_window, self.strategy.long_window)
    }

    /// Check everything that can be checked without loading data.
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        if self.backtest.start_date > self.backtest.end_date {
            return Err(ConfigFileError::InvalidDateRange {
                start: self.backtest.start_date,
                end: self.backtest.end_date,
            });
        }
        self.crossover()?;
        self.to_engine_config().validate()?;
        Ok(())
    }

    /// Deterministic content hash of this config.
    pub fn run_id(&self) -> Result<String, ConfigFileError> {
        let toml = self.to_toml()?;
        Ok(blake3::hash(toml.as_bytes()).to_hex().to_string())
    }
}

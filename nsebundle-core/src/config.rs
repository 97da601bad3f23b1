//! Bundle configuration.
//!
//! Everything a run needs is carried in one explicit `BundleConfig`, loaded
//! from TOML and passed to the pipeline. Nothing is read from the environment.

use crate::domain::ExchangeInfo;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("symbol universe is empty")]
    EmptyUniverse,

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("blank symbol at position {0}")]
    BlankSymbol(usize),
}

/// Where raw bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Yahoo chart API; `suffix` is appended to each symbol (".NS" for NSE).
    Yahoo { suffix: String },

    /// One `{SYMBOL}.csv` per symbol in `dir`.
    Csv { dir: PathBuf },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Yahoo {
            suffix: ".NS".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleConfig {
    pub symbol_universe: Vec<String>,

    /// Inclusive.
    pub start_date: NaiveDate,

    /// Inclusive.
    pub end_date: NaiveDate,

    pub calendar_name: String,

    /// Non-session days for weekday calendars. The only source of exchange
    /// holidays; `calendar_by_name` ships none.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub exchange: ExchangeInfo,

    #[serde(default)]
    pub provider: ProviderConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("bundle")
}

/// Large-cap NSE names used when no universe is configured.
pub const DEFAULT_NSE_SYMBOLS: [&str; 10] = [
    "RELIANCE",
    "TCS",
    "HDFCBANK",
    "INFY",
    "ICICIBANK",
    "HINDUNILVR",
    "ITC",
    "SBIN",
    "BHARTIARTL",
    "KOTAKBANK",
];

impl BundleConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: BundleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol_universe.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        if let Some(i) = self.symbol_universe.iter().position(|s| s.trim().is_empty()) {
            return Err(ConfigError::BlankSymbol(i));
        }
        if self.start_date > self.end_date {
            return Err(ConfigError::InvalidRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    /// NSE defaults: the large-cap list, XNSE calendar, Yahoo with `.NS`.
    ///
    /// `holidays` is left empty; add the exchange's closures to the TOML
    /// for holiday-accurate sessions.
    pub fn default_nse() -> Self {
        Self {
            symbol_universe: DEFAULT_NSE_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            calendar_name: "XNSE".into(),
            holidays: Vec::new(),
            output_dir: default_output_dir(),
            exchange: ExchangeInfo::nse(),
            provider: ProviderConfig::default(),
        }
    }
}

//! Configuration loaded from TOML

use crate::engine::EngineConfig;
use crate::error::{ExplorerError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Largest accepted `lookback_days` (about a century of calendar days)
pub const MAX_LOOKBACK_DAYS: i64 = 36_600;

/// How query results are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(ExplorerError::Parse(format!("Unknown output format: {}", other))),
        }
    }
}

/// Explorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// SQLite database holding the transaction history
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Width of the default range when no start date is given
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub output: OutputFormat,
}

fn default_database() -> PathBuf {
    PathBuf::from("market_data.db")
}

fn default_lookback_days() -> i64 {
    30
}

fn default_parallel() -> bool {
    true
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            lookback_days: default_lookback_days(),
            parallel: default_parallel(),
            output: OutputFormat::default(),
        }
    }
}

impl ExplorerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ExplorerConfig = toml::from_str(contents)
            .map_err(|e| ExplorerError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|e| {
                    ExplorerError::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&contents)
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0..=MAX_LOOKBACK_DAYS).contains(&self.lookback_days) {
            return Err(ExplorerError::Config(format!(
                "lookback_days must be between 0 and {}, got {}",
                MAX_LOOKBACK_DAYS, self.lookback_days
            )));
        }
        Ok(())
    }

    /// Default range start: `lookback_days` calendar days before `end`
    pub fn range_start(&self, end: NaiveDate) -> Result<NaiveDate> {
        self.validate()?;
        end.checked_sub_signed(Duration::days(self.lookback_days))
            .ok_or_else(|| {
                ExplorerError::Config(format!(
                    "lookback of {} days from {} is out of the date range",
                    self.lookback_days, end
                ))
            })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            parallel: self.parallel,
        }
    }
}

//! Error types for market_explorer

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for market_explorer
///
/// Empty universes, symbols with too little history and unknown
/// index/concept labels are not errors; they produce empty results.
#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed row for {symbol}: {reason}")]
    MalformedRow { symbol: String, reason: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ExplorerError {
    /// True when the failure came from the storage collaborator
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            ExplorerError::Storage(_) | ExplorerError::MalformedRow { .. }
        )
    }
}

/// Result type alias for market_explorer operations
pub type Result<T> = std::result::Result<T, ExplorerError>;

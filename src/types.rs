//! Core types and constants

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stock symbol identifier
pub type Symbol = String;

/// Price type (using f64 for precision)
pub type Price = f64;

/// Percentage type; `-1.0` means -1%
pub type Percent = f64;

/// One daily transaction record, unique per (symbol, date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub symbol: Symbol,
    pub open: Price,
    pub close: Price,
    pub high: Price,
    pub low: Price,
    pub volume: i64,
    /// Monetary turnover
    pub amount: f64,
    pub amplitude: Percent,
    pub change_rate: Percent,
    /// Absolute price delta
    pub change: Price,
    pub turnover_rate: Percent,
}

impl Transaction {
    /// Create a record with the given prices; the remaining fields start at zero
    pub fn new(
        date: NaiveDate,
        symbol: impl Into<Symbol>,
        open: Price,
        close: Price,
        high: Price,
        low: Price,
    ) -> Self {
        Self {
            date,
            symbol: symbol.into(),
            open,
            close,
            high,
            low,
            volume: 0,
            amount: 0.0,
            amplitude: 0.0,
            change_rate: 0.0,
            change: 0.0,
            turnover_rate: 0.0,
        }
    }

    /// Set volume and turnover amount
    pub fn with_volume(mut self, volume: i64, amount: f64) -> Self {
        self.volume = volume;
        self.amount = amount;
        self
    }

    /// Set the percentage change for the day
    pub fn with_change_rate(mut self, change_rate: Percent) -> Self {
        self.change_rate = change_rate;
        self
    }

    /// Ordering key used by range results
    pub fn date_symbol_key(&self) -> (NaiveDate, &str) {
        (self.date, self.symbol.as_str())
    }
}

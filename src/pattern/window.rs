//! Trailing trading-day windows per symbol

use crate::types::{Symbol, Transaction};
use chrono::NaiveDate;
use hashbrown::HashMap;

/// Trading days in a five-day-yang window (day 0 through day 5)
pub const WINDOW_LEN: usize = 6;

/// The six most recent trading days of one symbol on or before a cutoff
///
/// `days[0]` is the oldest, `days[5]` the most recent.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternWindow {
    symbol: Symbol,
    days: [Transaction; WINDOW_LEN],
}

impl PatternWindow {
    /// Build a window from one symbol's rows
    ///
    /// Rows after `cutoff` are ignored. Returns `None` when fewer than
    /// [`WINDOW_LEN`] eligible rows remain.
    pub fn from_history(
        symbol: Symbol,
        mut rows: Vec<Transaction>,
        cutoff: NaiveDate,
    ) -> Option<Self> {
        rows.retain(|t| t.date <= cutoff);
        if rows.len() < WINDOW_LEN {
            return None;
        }
        rows.sort_by_key(|t| t.date);
        let trailing = rows.split_off(rows.len() - WINDOW_LEN);
        let days = <[Transaction; WINDOW_LEN]>::try_from(trailing).ok()?;
        Some(Self { symbol, days })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Day `n` of the window, 0 = oldest
    ///
    /// # Panics
    /// If `n >= WINDOW_LEN`.
    pub fn day(&self, n: usize) -> &Transaction {
        &self.days[n]
    }

    pub fn days(&self) -> &[Transaction; WINDOW_LEN] {
        &self.days
    }

    pub fn first_date(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.days[WINDOW_LEN - 1].date
    }
}

/// Group rows by symbol
///
/// Rows for symbols absent from the input produce no entry, so every group
/// is non-empty.
pub fn group_by_symbol(rows: Vec<Transaction>) -> HashMap<Symbol, Vec<Transaction>> {
    let mut groups: HashMap<Symbol, Vec<Transaction>> = HashMap::new();
    for txn in rows {
        groups.entry(txn.symbol.clone()).or_insert_with(Vec::new).push(txn);
    }
    groups
}

/// Extract one window per symbol, dropping symbols with too little history
pub fn extract_windows(rows: Vec<Transaction>, cutoff: NaiveDate) -> Vec<PatternWindow> {
    group_by_symbol(rows)
        .into_iter()
        .filter_map(|(symbol, history)| {
            let available = history.len();
            let window = PatternWindow::from_history(symbol.clone(), history, cutoff);
            if window.is_none() {
                log::debug!(
                    "{} disqualified: fewer than {} trading days up to {} ({} rows)",
                    symbol,
                    WINDOW_LEN,
                    cutoff,
                    available
                );
            }
            window
        })
        .collect()
}

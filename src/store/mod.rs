//! Storage collaborator boundary
//!
//! The engine only reads through [`MarketStore`]. Each method is one fetch
//! and must observe a single consistent snapshot of the backing data.

pub mod memory;
#[cfg(feature = "rusqlite-support")]
pub mod sqlite;

pub use memory::InMemoryStore;
#[cfg(feature = "rusqlite-support")]
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::{Symbol, Transaction};
use crate::universe::Universe;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Read-only access to transaction history and membership tables
pub trait MarketStore: Send + Sync {
    /// Rows with `start <= date <= end`, restricted to a concrete universe
    fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        universe: &Universe,
    ) -> Result<Vec<Transaction>>;

    /// Per symbol, up to `depth` most recent rows dated on or before `cutoff`
    fn fetch_trailing(
        &self,
        cutoff: NaiveDate,
        depth: usize,
        universe: &Universe,
    ) -> Result<Vec<Transaction>>;

    /// Distinct index labels, ascending
    fn index_options(&self) -> Result<Vec<String>>;

    /// Distinct concept names, ascending
    fn concept_options(&self) -> Result<Vec<String>>;

    /// Symbols belonging to any of the given index labels
    fn symbols_by_index(&self, indices: &[String]) -> Result<BTreeSet<Symbol>>;

    /// Symbols belonging to any of the given concept names
    fn symbols_by_concept(&self, concepts: &[String]) -> Result<BTreeSet<Symbol>>;
}

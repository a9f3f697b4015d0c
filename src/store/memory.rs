//! In-memory market store

use super::MarketStore;
use crate::error::Result;
use crate::types::{Symbol, Transaction};
use crate::universe::Universe;
use chrono::NaiveDate;
use hashbrown::HashMap;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory transaction history with index and concept membership
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    /// Rows keyed by symbol, then by date
    rows: HashMap<Symbol, BTreeMap<NaiveDate, Transaction>>,
    /// Index label -> member symbols
    index_members: HashMap<String, BTreeSet<Symbol>>,
    /// Concept name -> concept symbol
    concept_names: HashMap<String, String>,
    /// Concept symbol -> member symbols
    concept_members: HashMap<String, BTreeSet<Symbol>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction row; a row for an existing (symbol, date) replaces it
    pub fn add_transaction(&mut self, txn: Transaction) {
        self.rows
            .entry(txn.symbol.clone())
            .or_insert_with(BTreeMap::new)
            .insert(txn.date, txn);
    }

    /// Add many transaction rows
    pub fn extend<I: IntoIterator<Item = Transaction>>(&mut self, rows: I) {
        for txn in rows {
            self.add_transaction(txn);
        }
    }

    /// Register a symbol as a member of an index
    pub fn add_index_member(&mut self, index: &str, symbol: &str) {
        self.index_members
            .entry(index.to_string())
            .or_insert_with(BTreeSet::new)
            .insert(symbol.to_string());
    }

    /// Register a concept name and its grouping symbol
    pub fn add_concept(&mut self, name: &str, concept_symbol: &str) {
        self.concept_names
            .insert(name.to_string(), concept_symbol.to_string());
    }

    /// Register a stock as a member of a concept symbol
    pub fn add_concept_member(&mut self, concept_symbol: &str, symbol: &str) {
        self.concept_members
            .entry(concept_symbol.to_string())
            .or_insert_with(BTreeSet::new)
            .insert(symbol.to_string());
    }

    /// Total number of stored rows
    pub fn len(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn candidate_rows<'a>(
        &'a self,
        universe: &'a Universe,
    ) -> impl Iterator<Item = &'a BTreeMap<NaiveDate, Transaction>> + 'a {
        self.rows
            .iter()
            .filter(move |(symbol, _)| universe.contains(symbol))
            .map(|(_, rows)| rows)
    }
}

impl MarketStore for InMemoryStore {
    fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        universe: &Universe,
    ) -> Result<Vec<Transaction>> {
        if start > end {
            return Ok(Vec::new());
        }
        let mut out: Vec<Transaction> = self
            .candidate_rows(universe)
            .flat_map(|rows| rows.range(start..=end).map(|(_, t)| t.clone()))
            .collect();
        out.sort_by(|a, b| a.date_symbol_key().cmp(&b.date_symbol_key()));
        Ok(out)
    }

    fn fetch_trailing(
        &self,
        cutoff: NaiveDate,
        depth: usize,
        universe: &Universe,
    ) -> Result<Vec<Transaction>> {
        let mut out = Vec::new();
        for rows in self.candidate_rows(universe) {
            let mut trailing: Vec<Transaction> = rows
                .range(..=cutoff)
                .rev()
                .take(depth)
                .map(|(_, t)| t.clone())
                .collect();
            trailing.reverse();
            out.extend(trailing);
        }
        Ok(out)
    }

    fn index_options(&self) -> Result<Vec<String>> {
        let mut options: Vec<String> = self.index_members.keys().cloned().collect();
        options.sort();
        Ok(options)
    }

    fn concept_options(&self) -> Result<Vec<String>> {
        let mut options: Vec<String> = self.concept_names.keys().cloned().collect();
        options.sort();
        Ok(options)
    }

    fn symbols_by_index(&self, indices: &[String]) -> Result<BTreeSet<Symbol>> {
        Ok(indices
            .iter()
            .filter_map(|index| self.index_members.get(index))
            .flatten()
            .cloned()
            .collect())
    }

    fn symbols_by_concept(&self, concepts: &[String]) -> Result<BTreeSet<Symbol>> {
        Ok(concepts
            .iter()
            .filter_map(|name| self.concept_names.get(name))
            .filter_map(|concept_symbol| self.concept_members.get(concept_symbol))
            .flatten()
            .cloned()
            .collect())
    }
}

//! Query engine: range queries and five-day-yang detection

use crate::error::Result;
use crate::pattern::{extract_windows, FiveDayYang, PatternWindow, SummaryRow, WINDOW_LEN};
use crate::store::MarketStore;
use crate::types::Transaction;
use crate::universe::{self, Universe};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::sync::Arc;

/// Configuration for the query engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Evaluate per-symbol windows on the rayon thread pool
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Read-only query engine over a [`MarketStore`]
///
/// Holds no mutable state; queries may run concurrently from any thread.
pub struct QueryEngine {
    /// Engine configuration
    config: EngineConfig,
    /// Backing store
    store: Arc<dyn MarketStore>,
    /// Pattern predicate
    detector: FiveDayYang,
}

impl QueryEngine {
    /// Create a new query engine
    pub fn new(config: EngineConfig, store: Arc<dyn MarketStore>) -> Self {
        Self {
            config,
            store,
            detector: FiveDayYang::new(),
        }
    }

    /// Create engine with default configuration
    pub fn with_store(store: Arc<dyn MarketStore>) -> Self {
        Self::new(EngineConfig::default(), store)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MarketStore> {
        &self.store
    }

    /// Distinct index labels for filter pickers
    pub fn index_options(&self) -> Result<Vec<String>> {
        self.store.index_options()
    }

    /// Distinct concept names for filter pickers
    pub fn concept_options(&self) -> Result<Vec<String>> {
        self.store.concept_options()
    }

    /// Resolve index and concept selections into a universe
    pub fn resolve_universe(&self, indices: &[String], concepts: &[String]) -> Result<Universe> {
        universe::resolve(self.store.as_ref(), indices, concepts)
    }

    /// All rows with `start <= date <= end` within `universe`,
    /// ordered by `(date, symbol)`
    ///
    /// `start <= end` is the caller's responsibility; bounds are not reordered.
    pub fn query_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        universe: &Universe,
    ) -> Result<Vec<Transaction>> {
        if universe.is_empty() {
            log::debug!("Empty universe, skipping range query");
            return Ok(Vec::new());
        }

        let mut rows = self.store.fetch_range(start, end, universe)?;
        rows.retain(|t| t.date >= start && t.date <= end && universe.contains(&t.symbol));
        rows.sort_by(|a, b| a.date_symbol_key().cmp(&b.date_symbol_key()));

        log::info!(
            "Range query {}..={} over {} symbols: {} rows",
            start,
            end,
            universe,
            rows.len()
        );
        Ok(rows)
    }

    /// Summary rows for every symbol whose six most recent trading days on
    /// or before `cutoff` form a five-day-yang, ordered by symbol
    pub fn query_five_day_yang(
        &self,
        cutoff: NaiveDate,
        universe: &Universe,
    ) -> Result<Vec<SummaryRow>> {
        if universe.is_empty() {
            log::debug!("Empty universe, skipping {}", self.detector.name());
            return Ok(Vec::new());
        }

        let mut rows = self.store.fetch_trailing(cutoff, WINDOW_LEN, universe)?;
        rows.retain(|t| universe.contains(&t.symbol));
        let windows = extract_windows(rows, cutoff);
        let candidates = windows.len();

        let mut summaries = self.evaluate(windows);
        summaries.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        log::info!(
            "{} up to {}: {} of {} candidate symbols qualify",
            self.detector.name(),
            cutoff,
            summaries.len(),
            candidates
        );
        Ok(summaries)
    }

    /// Filter windows through the detector and project the survivors
    fn evaluate(&self, windows: Vec<PatternWindow>) -> Vec<SummaryRow> {
        let detector = self.detector;
        if self.config.parallel {
            windows
                .into_par_iter()
                .filter(|w| detector.matches(w))
                .map(|w| SummaryRow::from(&w))
                .collect()
        } else {
            windows
                .iter()
                .filter(|w| detector.matches(w))
                .map(SummaryRow::from)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExplorerError;
    use crate::store::InMemoryStore;
    use crate::types::Symbol;
    use std::collections::BTreeSet;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    /// Six trading days (skipping the weekend of 6-7 April) that qualify
    fn yang_rows(symbol: &str) -> Vec<Transaction> {
        let days = [1, 2, 3, 4, 5, 8];
        let amounts = [100.0, 130.0, 110.0, 105.0, 120.0, 140.0];
        let rates = [-2.0, 3.0, 0.5, -1.0, 1.2, 2.0];
        (0..6)
            .map(|i| {
                let close = 10.0 + i as f64;
                Transaction::new(day(days[i]), symbol, close - 0.2, close, close + 0.3, close - 0.4)
                    .with_volume(1_000 * (i as i64 + 1), amounts[i])
                    .with_change_rate(rates[i])
            })
            .collect()
    }

    fn engine_with(store: InMemoryStore, parallel: bool) -> QueryEngine {
        QueryEngine::new(EngineConfig { parallel }, Arc::new(store))
    }

    #[test]
    fn test_end_to_end_single_symbol() {
        let mut store = InMemoryStore::new();
        store.extend(yang_rows("X"));
        let engine = engine_with(store, true);

        let rows = engine.query_five_day_yang(day(8), &Universe::Unrestricted).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "X");
        assert_eq!(rows[0].date_start, day(1));
        assert_eq!(rows[0].date_end, day(8));
        assert_eq!(rows[0].day5_close, 15.0);
        assert_eq!(rows[0].day0_close, 10.0);
    }

    #[test]
    fn test_results_sorted_by_symbol_in_both_modes() {
        for parallel in [true, false] {
            let mut store = InMemoryStore::new();
            for symbol in ["600519", "000001", "300750", "600000"] {
                store.extend(yang_rows(symbol));
            }
            let engine = engine_with(store, parallel);

            let rows = engine.query_five_day_yang(day(8), &Universe::Unrestricted).unwrap();
            let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
            assert_eq!(symbols, vec!["000001", "300750", "600000", "600519"]);
        }
    }

    #[test]
    fn test_universe_restricts_detection() {
        let mut store = InMemoryStore::new();
        store.extend(yang_rows("A"));
        store.extend(yang_rows("B"));
        let engine = engine_with(store, false);

        let rows = engine.query_five_day_yang(day(8), &Universe::symbols(["B", "Z"])).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "B");
    }

    #[test]
    fn test_cutoff_before_last_day_shifts_window() {
        let mut store = InMemoryStore::new();
        store.extend(yang_rows("X"));
        let engine = engine_with(store, false);

        // Only five trading days on or before the 5th
        let rows = engine.query_five_day_yang(day(5), &Universe::Unrestricted).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_range_inclusive_and_ordered() {
        let mut store = InMemoryStore::new();
        store.extend(yang_rows("B"));
        store.extend(yang_rows("A"));
        let engine = engine_with(store, false);

        let rows = engine.query_range(day(2), day(4), &Universe::Unrestricted).unwrap();
        let keys: Vec<(NaiveDate, &str)> = rows.iter().map(|t| t.date_symbol_key()).collect();
        assert_eq!(
            keys,
            vec![
                (day(2), "A"),
                (day(2), "B"),
                (day(3), "A"),
                (day(3), "B"),
                (day(4), "A"),
                (day(4), "B"),
            ]
        );
    }

    /// Store that fails every call, counting how often it was reached
    struct FailingStore {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl FailingStore {
        fn fail(&self) -> ExplorerError {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            ExplorerError::Storage("unreachable".to_string())
        }
    }

    impl MarketStore for FailingStore {
        fn fetch_range(&self, _: NaiveDate, _: NaiveDate, _: &Universe) -> Result<Vec<Transaction>> {
            Err(self.fail())
        }
        fn fetch_trailing(&self, _: NaiveDate, _: usize, _: &Universe) -> Result<Vec<Transaction>> {
            Err(self.fail())
        }
        fn index_options(&self) -> Result<Vec<String>> {
            Err(self.fail())
        }
        fn concept_options(&self) -> Result<Vec<String>> {
            Err(self.fail())
        }
        fn symbols_by_index(&self, _: &[String]) -> Result<BTreeSet<Symbol>> {
            Err(self.fail())
        }
        fn symbols_by_concept(&self, _: &[String]) -> Result<BTreeSet<Symbol>> {
            Err(self.fail())
        }
    }

    #[test]
    fn test_empty_universe_never_touches_store() {
        let store = Arc::new(FailingStore {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let engine = QueryEngine::with_store(store.clone());

        assert!(engine.query_range(day(1), day(30), &Universe::empty()).unwrap().is_empty());
        assert!(engine.query_five_day_yang(day(30), &Universe::empty()).unwrap().is_empty());
        assert_eq!(engine.resolve_universe(&[], &[]).unwrap(), Universe::Unrestricted);
        assert_eq!(store.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_storage_failure_propagates() {
        let engine = QueryEngine::with_store(Arc::new(FailingStore {
            calls: std::sync::atomic::AtomicUsize::new(0),
        }));

        let err = engine.query_range(day(1), day(2), &Universe::Unrestricted).unwrap_err();
        assert!(err.is_storage());
        let err = engine.query_five_day_yang(day(2), &Universe::Unrestricted).unwrap_err();
        assert!(err.is_storage());
        assert!(engine.resolve_universe(&["SSE".to_string()], &[]).is_err());
        assert!(engine.index_options().is_err());
    }
}

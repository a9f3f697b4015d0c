//! # market_explorer
//!
//! Query and pattern-detection engine over a daily stock transaction history.
//!
//! Two queries are offered: a date/symbol filtered row dump, and detection of
//! the five-day-yang pattern, which yields one summary row per qualifying
//! symbol. Both take a [`Universe`](universe::Universe) resolved from index
//! and concept selections.
//!
//! ## Example
//!
//! ```rust,no_run
//! use market_explorer::prelude::*;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! # fn main() -> market_explorer::error::Result<()> {
//! let store = SqliteStore::open_read_only(std::path::Path::new("market_data.db"))?;
//! let engine = QueryEngine::with_store(Arc::new(store));
//!
//! let universe = engine.resolve_universe(&["SSE".to_string()], &[])?;
//! let cutoff = NaiveDate::from_ymd_opt(2024, 4, 8).unwrap();
//! for row in engine.query_five_day_yang(cutoff, &universe)? {
//!     println!("{} {} -> {}", row.symbol, row.date_start, row.date_end);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod report;
pub mod store;
pub mod types;
pub mod universe;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::config::{ExplorerConfig, OutputFormat};
    pub use crate::engine::{EngineConfig, QueryEngine};
    pub use crate::error::{ExplorerError, Result};
    pub use crate::pattern::{FiveDayYang, PatternWindow, SummaryRow};
    pub use crate::store::{InMemoryStore, MarketStore};
    #[cfg(feature = "rusqlite-support")]
    pub use crate::store::SqliteStore;
    pub use crate::types::*;
    pub use crate::universe::Universe;
}

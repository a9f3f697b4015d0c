//! Symbol universe resolution
//!
//! Index and concept selections each restrict the symbol population; an
//! empty selection leaves its dimension unrestricted. The final universe is
//! the intersection of both dimensions.

use crate::error::Result;
use crate::store::MarketStore;
use crate::types::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Resolved symbol filter
///
/// `Unrestricted` is not the same as an empty set: it matches every symbol,
/// while `Symbols` with an empty set matches none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Universe {
    Unrestricted,
    Symbols(BTreeSet<Symbol>),
}

impl Universe {
    /// Concrete universe from any collection of symbols
    pub fn symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Universe::Symbols(symbols.into_iter().map(Into::into).collect())
    }

    /// Concrete universe containing nothing
    pub fn empty() -> Self {
        Universe::Symbols(BTreeSet::new())
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Universe::Unrestricted)
    }

    /// True only for a concrete empty set
    pub fn is_empty(&self) -> bool {
        matches!(self, Universe::Symbols(set) if set.is_empty())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        match self {
            Universe::Unrestricted => true,
            Universe::Symbols(set) => set.contains(symbol),
        }
    }

    /// Number of symbols, `None` when unrestricted
    pub fn len(&self) -> Option<usize> {
        match self {
            Universe::Unrestricted => None,
            Universe::Symbols(set) => Some(set.len()),
        }
    }

    /// Concrete symbol set, `None` when unrestricted
    pub fn as_set(&self) -> Option<&BTreeSet<Symbol>> {
        match self {
            Universe::Unrestricted => None,
            Universe::Symbols(set) => Some(set),
        }
    }

    /// Intersection; `Unrestricted` is the identity element
    pub fn intersect(self, other: Universe) -> Universe {
        match (self, other) {
            (Universe::Unrestricted, other) => other,
            (this, Universe::Unrestricted) => this,
            (Universe::Symbols(a), Universe::Symbols(b)) => {
                let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
                Universe::Symbols(small.into_iter().filter(|s| large.contains(s)).collect())
            }
        }
    }
}

impl std::fmt::Display for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Universe::Unrestricted => write!(f, "all"),
            Universe::Symbols(set) => write!(f, "{}", set.len()),
        }
    }
}

/// Index-dimension restriction: union of members of every selected index
pub fn index_universe(store: &dyn MarketStore, indices: &[String]) -> Result<Universe> {
    if indices.is_empty() {
        return Ok(Universe::Unrestricted);
    }
    Ok(Universe::Symbols(store.symbols_by_index(indices)?))
}

/// Concept-dimension restriction: union of members of every selected concept name
pub fn concept_universe(store: &dyn MarketStore, concepts: &[String]) -> Result<Universe> {
    if concepts.is_empty() {
        return Ok(Universe::Unrestricted);
    }
    Ok(Universe::Symbols(store.symbols_by_concept(concepts)?))
}

/// Resolve index and concept selections into the final universe
///
/// When both selections are empty no membership fetch is issued and the
/// result is `Unrestricted`.
pub fn resolve(
    store: &dyn MarketStore,
    indices: &[String],
    concepts: &[String],
) -> Result<Universe> {
    let by_index = index_universe(store, indices)?;
    let by_concept = concept_universe(store, concepts)?;
    let universe = by_index.intersect(by_concept);

    log::debug!(
        "Resolved universe from {} indices and {} concepts: {} symbols",
        indices.len(),
        concepts.len(),
        universe
    );
    Ok(universe)
}

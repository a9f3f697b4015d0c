//! Five-day-yang detector
//!
//! Over a six-day window (day 0 .. day 5) a symbol qualifies when
//! - day 1 turnover is at least 1.25x day 0 turnover, and
//! - no day from day 1 through day 5 closed down more than 1%.
//!
//! Comparisons are exact on the stored values.

use super::window::{PatternWindow, WINDOW_LEN};
use crate::types::Percent;

/// Minimum ratio of day 1 amount to day 0 amount
pub const AMOUNT_SURGE_RATIO: f64 = 1.25;

/// Lowest allowed `change_rate` on days 1..=5, in percent
pub const MAX_PULLBACK_PCT: Percent = -1.0;

/// Five-day-yang pattern predicate
#[derive(Debug, Clone, Copy, Default)]
pub struct FiveDayYang;

impl FiveDayYang {
    pub fn new() -> Self {
        Self
    }

    /// Pattern name used in logs and reports
    pub fn name(&self) -> &str {
        "five_day_yang"
    }

    /// Turnover surge from day 0 to day 1
    pub fn has_amount_surge(&self, window: &PatternWindow) -> bool {
        window.day(1).amount >= AMOUNT_SURGE_RATIO * window.day(0).amount
    }

    /// No day after day 0 fell below the pullback limit
    pub fn has_no_pullback(&self, window: &PatternWindow) -> bool {
        (1..WINDOW_LEN).all(|n| window.day(n).change_rate >= MAX_PULLBACK_PCT)
    }

    /// True when the window satisfies both conditions
    pub fn matches(&self, window: &PatternWindow) -> bool {
        self.has_amount_surge(window) && self.has_no_pullback(window)
    }
}

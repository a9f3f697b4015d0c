//! Multi-day pattern detection over trailing trading-day windows

pub mod five_day_yang;
pub mod summary;
pub mod window;

pub use five_day_yang::{FiveDayYang, AMOUNT_SURGE_RATIO, MAX_PULLBACK_PCT};
pub use summary::SummaryRow;
pub use window::{extract_windows, group_by_symbol, PatternWindow, WINDOW_LEN};

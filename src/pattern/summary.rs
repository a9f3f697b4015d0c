//! Summary rows for qualifying windows

use super::window::PatternWindow;
use crate::types::{Price, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row per qualifying symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub symbol: Symbol,
    pub day5_close: Price,
    pub day5_open: Price,
    pub day4_close: Price,
    pub day3_close: Price,
    pub day2_close: Price,
    pub day1_close: Price,
    pub day0_close: Price,
}

impl From<&PatternWindow> for SummaryRow {
    fn from(window: &PatternWindow) -> Self {
        let close = |n: usize| window.day(n).close;
        Self {
            date_start: window.first_date(),
            date_end: window.last_date(),
            symbol: window.symbol().to_string(),
            day5_close: close(5),
            day5_open: window.day(5).open,
            day4_close: close(4),
            day3_close: close(3),
            day2_close: close(2),
            day1_close: close(1),
            day0_close: close(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;

    #[test]
    fn test_projection_reads_each_day() {
        let rows: Vec<Transaction> = (0..6)
            .map(|i| {
                let date = NaiveDate::from_ymd_opt(2024, 7, 1 + i).unwrap();
                let close = 10.0 + i as f64;
                Transaction::new(date, "X", close - 0.5, close, close + 1.0, close - 1.0)
            })
            .collect();
        let window = PatternWindow::from_history("X".into(), rows, NaiveDate::from_ymd_opt(2024, 7, 6).unwrap())
            .unwrap();

        let row = SummaryRow::from(&window);
        assert_eq!(row.symbol, "X");
        assert_eq!(row.date_start, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(row.date_end, NaiveDate::from_ymd_opt(2024, 7, 6).unwrap());
        assert_eq!(row.day0_close, 10.0);
        assert_eq!(row.day1_close, 11.0);
        assert_eq!(row.day2_close, 12.0);
        assert_eq!(row.day3_close, 13.0);
        assert_eq!(row.day4_close, 14.0);
        assert_eq!(row.day5_close, 15.0);
        assert_eq!(row.day5_open, 14.5);
    }
}

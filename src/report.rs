//! Rendering query results as CSV, JSON or a plain table

use crate::config::OutputFormat;
use crate::error::Result;
use crate::pattern::SummaryRow;
use crate::types::Transaction;
use serde::Serialize;
use std::io::Write;

/// Rows that can be rendered as an aligned text table
pub trait TableRow {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

impl TableRow for Transaction {
    fn headers() -> &'static [&'static str] {
        &[
            "date", "symbol", "open", "close", "high", "low", "volume", "amount",
            "amplitude", "change_rate", "change", "turnover_rate",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.date.to_string(),
            self.symbol.clone(),
            format!("{:.2}", self.open),
            format!("{:.2}", self.close),
            format!("{:.2}", self.high),
            format!("{:.2}", self.low),
            self.volume.to_string(),
            format!("{:.2}", self.amount),
            format!("{:.2}", self.amplitude),
            format!("{:.2}", self.change_rate),
            format!("{:.2}", self.change),
            format!("{:.2}", self.turnover_rate),
        ]
    }
}

impl TableRow for SummaryRow {
    fn headers() -> &'static [&'static str] {
        &[
            "date_start", "date_end", "symbol", "day5_close", "day5_open", "day4_close",
            "day3_close", "day2_close", "day1_close", "day0_close",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.date_start.to_string(),
            self.date_end.to_string(),
            self.symbol.clone(),
            format!("{:.2}", self.day5_close),
            format!("{:.2}", self.day5_open),
            format!("{:.2}", self.day4_close),
            format!("{:.2}", self.day3_close),
            format!("{:.2}", self.day2_close),
            format!("{:.2}", self.day1_close),
            format!("{:.2}", self.day0_close),
        ]
    }
}

/// Write rows as CSV with a header from the field names
pub fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write rows as a pretty-printed JSON array
pub fn write_json<W: Write, T: Serialize>(mut writer: W, rows: &[T]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writeln!(writer)?;
    Ok(())
}

/// Write rows as a column-aligned table
pub fn write_table<W: Write, T: TableRow>(mut writer: W, rows: &[T]) -> Result<()> {
    let headers = T::headers();
    let cells: Vec<Vec<String>> = rows.iter().map(TableRow::cells).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:>width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    writeln!(writer, "{}", line(headers.to_vec()))?;
    for row in &cells {
        writeln!(writer, "{}", line(row.iter().map(String::as_str).collect()))?;
    }
    Ok(())
}

/// Render rows in the requested format
pub fn render<W: Write, T: Serialize + TableRow>(
    writer: W,
    rows: &[T],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(writer, rows),
        OutputFormat::Csv => write_csv(writer, rows),
        OutputFormat::Json => write_json(writer, rows),
    }
}

//! Market store backed by SQLite

use super::MarketStore;
use crate::error::{ExplorerError, Result};
use crate::types::{Symbol, Transaction};
use crate::universe::Universe;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Row};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const TRANSACTION_COLUMNS: &str = "date, symbol, open, close, high, low, volume, amount, \
                                   amplitude, change_rate, change, turnover_rate";

/// SQLite store using the `transactions`, `stocks`, `concept_names_em`
/// and `concept_cons_em` tables
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open database at path
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .map_err(|e| ExplorerError::Storage(format!("Failed to open database: {}", e)))?;

        let store = Self { conn: Mutex::new(conn) };
        store.create_tables()?;
        Ok(store)
    }

    /// Open an existing database without touching its schema
    pub fn open_read_only(db_path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            ExplorerError::Storage(format!(
                "Failed to open database {}: {}",
                db_path.display(),
                e
            ))
        })?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            ExplorerError::Storage(format!("Failed to create in-memory database: {}", e))
        })?;

        let store = Self { conn: Mutex::new(conn) };
        store.create_tables()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ExplorerError::Storage("Database connection lock poisoned".to_string()))
    }

    /// Create database tables
    pub fn create_tables(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS transactions (
                    date TEXT NOT NULL,
                    symbol TEXT NOT NULL,
                    open REAL,
                    close REAL,
                    high REAL,
                    low REAL,
                    volume INTEGER,
                    amount REAL,
                    amplitude REAL,
                    change_rate REAL,
                    change REAL,
                    turnover_rate REAL
                );
                CREATE INDEX IF NOT EXISTS idx_transactions_symbol_date ON transactions(symbol, date);
                CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
                CREATE TABLE IF NOT EXISTS stocks (
                    symbol TEXT NOT NULL,
                    \"index\" TEXT
                );
                CREATE TABLE IF NOT EXISTS concept_names_em (
                    concept_name TEXT NOT NULL,
                    concept_symbol TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS concept_cons_em (
                    concept_symbol TEXT NOT NULL,
                    symbol TEXT NOT NULL
                );",
            )
            .map_err(|e| ExplorerError::Storage(format!("Failed to create tables: {}", e)))
    }

    /// Insert transaction rows in one SQLite transaction
    pub fn insert_transactions(&self, rows: &[Transaction]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| ExplorerError::Storage(format!("Failed to begin transaction: {}", e)))?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO transactions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    TRANSACTION_COLUMNS
                ))
                .map_err(|e| ExplorerError::Storage(format!("Failed to prepare insert: {}", e)))?;

            for t in rows {
                stmt.execute(params![
                    t.date.to_string(),
                    &t.symbol,
                    t.open,
                    t.close,
                    t.high,
                    t.low,
                    t.volume,
                    t.amount,
                    t.amplitude,
                    t.change_rate,
                    t.change,
                    t.turnover_rate,
                ])
                .map_err(|e| ExplorerError::Storage(format!("Failed to insert transaction: {}", e)))?;
            }
        }
        tx.commit()
            .map_err(|e| ExplorerError::Storage(format!("Failed to commit transactions: {}", e)))?;
        Ok(rows.len())
    }

    /// Register a symbol as a member of an index
    pub fn insert_index_member(&self, index: &str, symbol: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO stocks (symbol, \"index\") VALUES (?1, ?2)",
                params![symbol, index],
            )
            .map_err(|e| ExplorerError::Storage(format!("Failed to insert stock: {}", e)))?;
        Ok(())
    }

    /// Register a concept name and its grouping symbol
    pub fn insert_concept(&self, name: &str, concept_symbol: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO concept_names_em (concept_name, concept_symbol) VALUES (?1, ?2)",
                params![name, concept_symbol],
            )
            .map_err(|e| ExplorerError::Storage(format!("Failed to insert concept: {}", e)))?;
        Ok(())
    }

    /// Register a stock as a member of a concept symbol
    pub fn insert_concept_member(&self, concept_symbol: &str, symbol: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO concept_cons_em (concept_symbol, symbol) VALUES (?1, ?2)",
                params![concept_symbol, symbol],
            )
            .map_err(|e| {
                ExplorerError::Storage(format!("Failed to insert concept member: {}", e))
            })?;
        Ok(())
    }

    /// Get transaction row count
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
            .map_err(|e| ExplorerError::Storage(format!("Failed to count transactions: {}", e)))?;
        Ok(count as usize)
    }

    /// Run a query whose rows are transactions, converting decode failures
    /// into `MalformedRow`
    fn query_transactions(&self, sql: &str, values: Vec<Value>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| ExplorerError::Storage(format!("Failed to prepare query: {}", e)))?;

        let raw = stmt
            .query_map(params_from_iter(values.iter()), RawRow::from_row)
            .map_err(|e| ExplorerError::Storage(format!("Failed to query transactions: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ExplorerError::Storage(format!("Failed to collect transactions: {}", e)))?;

        raw.into_iter().map(RawRow::into_transaction).collect()
    }

    fn query_strings(&self, sql: &str, values: &[String]) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| ExplorerError::Storage(format!("Failed to prepare query: {}", e)))?;

        let out = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))
            .map_err(|e| ExplorerError::Storage(format!("Failed to query values: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ExplorerError::Storage(format!("Failed to collect values: {}", e)))?;
        Ok(out)
    }
}

/// `?, ?, ?` with one placeholder per value
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Exclusive upper bound on the day after `date`, so stored values with a
/// time suffix still match; no bound at all when `date` is the last
/// representable day
fn upper_bound_clause(date: NaiveDate) -> (&'static str, Vec<Value>) {
    match date.succ_opt() {
        Some(next) => (" AND date < ?", vec![Value::Text(next.to_string())]),
        None => ("", Vec::new()),
    }
}

/// Symbol restriction clause and its bound values
fn symbol_clause(universe: &Universe) -> (String, Vec<Value>) {
    match universe.as_set() {
        None => (String::new(), Vec::new()),
        Some(symbols) => (
            format!(" AND symbol IN ({})", placeholders(symbols.len())),
            symbols.iter().map(|s| Value::Text(s.clone())).collect(),
        ),
    }
}

/// Column values as stored, before date parsing
struct RawRow {
    date: String,
    symbol: String,
    open: Option<f64>,
    close: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    volume: Value,
    amount: Option<f64>,
    amplitude: Option<f64>,
    change_rate: Option<f64>,
    change: Option<f64>,
    turnover_rate: Option<f64>,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            symbol: row.get(1)?,
            open: row.get(2)?,
            close: row.get(3)?,
            high: row.get(4)?,
            low: row.get(5)?,
            volume: row.get(6)?,
            amount: row.get(7)?,
            amplitude: row.get(8)?,
            change_rate: row.get(9)?,
            change: row.get(10)?,
            turnover_rate: row.get(11)?,
        })
    }

    fn into_transaction(self) -> Result<Transaction> {
        // "2024-01-02" or "2024-01-02 00:00:00"
        let day = self.date.get(..10).unwrap_or(&self.date);
        let date = match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                return Err(ExplorerError::MalformedRow {
                    symbol: self.symbol,
                    reason: format!("bad date {:?}: {}", self.date, e),
                })
            }
        };

        let volume = decode_volume(&self.volume).map_err(|reason| ExplorerError::MalformedRow {
            symbol: self.symbol.clone(),
            reason: format!("{} on {}", reason, date),
        })?;

        let columns = [
            ("open", self.open),
            ("close", self.close),
            ("high", self.high),
            ("low", self.low),
            ("amount", self.amount),
            ("amplitude", self.amplitude),
            ("change_rate", self.change_rate),
            ("change", self.change),
            ("turnover_rate", self.turnover_rate),
        ];
        let mut values = [0.0_f64; 9];
        for (slot, (column, value)) in values.iter_mut().zip(columns) {
            *slot = value.ok_or_else(|| ExplorerError::MalformedRow {
                symbol: self.symbol.clone(),
                reason: format!("NULL {} on {}", column, date),
            })?;
        }
        let [open, close, high, low, amount, amplitude, change_rate, change, turnover_rate] = values;

        Ok(Transaction {
            date,
            symbol: self.symbol,
            open,
            close,
            high,
            low,
            volume,
            amount,
            amplitude,
            change_rate,
            change,
            turnover_rate,
        })
    }
}

/// Share count from an INTEGER column, or a REAL holding a whole number
fn decode_volume(value: &Value) -> std::result::Result<i64, String> {
    match value {
        Value::Integer(v) => Ok(*v),
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        Value::Real(v) if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 => {
            Ok(*v as i64)
        }
        Value::Real(v) => Err(format!("non-integral volume {}", v)),
        Value::Null => Err("NULL volume".to_string()),
        Value::Text(_) | Value::Blob(_) => Err("non-numeric volume".to_string()),
    }
}

impl MarketStore for SqliteStore {
    fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        universe: &Universe,
    ) -> Result<Vec<Transaction>> {
        if universe.is_empty() {
            return Ok(Vec::new());
        }
        let (upper, bound) = upper_bound_clause(end);
        let (clause, symbols) = symbol_clause(universe);
        let sql = format!(
            "SELECT {} FROM transactions WHERE date >= ?{}{} ORDER BY date, symbol",
            TRANSACTION_COLUMNS, upper, clause
        );

        let mut values = vec![Value::Text(start.to_string())];
        values.extend(bound);
        values.extend(symbols);
        self.query_transactions(&sql, values)
    }

    fn fetch_trailing(
        &self,
        cutoff: NaiveDate,
        depth: usize,
        universe: &Universe,
    ) -> Result<Vec<Transaction>> {
        if universe.is_empty() || depth == 0 {
            return Ok(Vec::new());
        }
        let (upper, bound) = upper_bound_clause(cutoff);
        let (clause, symbols) = symbol_clause(universe);
        let sql = format!(
            "WITH ranked AS (
                SELECT {cols},
                       ROW_NUMBER() OVER (PARTITION BY symbol ORDER BY date DESC) AS rn_desc
                FROM transactions
                WHERE date IS NOT NULL{upper}{clause}
            )
            SELECT {cols} FROM ranked WHERE rn_desc <= ? ORDER BY symbol, date",
            cols = TRANSACTION_COLUMNS,
            upper = upper,
            clause = clause
        );

        let mut values = bound;
        values.extend(symbols);
        values.push(Value::Integer(depth as i64));
        self.query_transactions(&sql, values)
    }

    fn index_options(&self) -> Result<Vec<String>> {
        self.query_strings(
            "SELECT DISTINCT \"index\" FROM stocks WHERE \"index\" IS NOT NULL ORDER BY \"index\"",
            &[],
        )
    }

    fn concept_options(&self) -> Result<Vec<String>> {
        self.query_strings(
            "SELECT DISTINCT concept_name FROM concept_names_em ORDER BY concept_name",
            &[],
        )
    }

    fn symbols_by_index(&self, indices: &[String]) -> Result<BTreeSet<Symbol>> {
        if indices.is_empty() {
            return Ok(BTreeSet::new());
        }
        let sql = format!(
            "SELECT DISTINCT symbol FROM stocks WHERE \"index\" IN ({})",
            placeholders(indices.len())
        );
        Ok(self.query_strings(&sql, indices)?.into_iter().collect())
    }

    fn symbols_by_concept(&self, concepts: &[String]) -> Result<BTreeSet<Symbol>> {
        if concepts.is_empty() {
            return Ok(BTreeSet::new());
        }
        let sql = format!(
            "SELECT DISTINCT cc.symbol
             FROM concept_cons_em cc
             JOIN concept_names_em cn ON cc.concept_symbol = cn.concept_symbol
             WHERE cn.concept_name IN ({})",
            placeholders(concepts.len())
        );
        Ok(self.query_strings(&sql, concepts)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn row(d: u32, symbol: &str) -> Transaction {
        Transaction::new(day(d), symbol, 10.0, 10.2, 10.5, 9.8).with_volume(1_000, 10_200.0)
    }

    #[test]
    fn test_store_creation() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_fetch_range() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .insert_transactions(&[row(3, "B"), row(2, "B"), row(2, "A"), row(5, "A")])
            .unwrap();
        assert_eq!(store.count().unwrap(), 4);

        let rows = store.fetch_range(day(2), day(3), &Universe::Unrestricted).unwrap();
        let keys: Vec<(NaiveDate, &str)> = rows.iter().map(|t| t.date_symbol_key()).collect();
        assert_eq!(keys, vec![(day(2), "A"), (day(2), "B"), (day(3), "B")]);
        assert_eq!(rows[0].amount, 10_200.0);
        assert_eq!(rows[0].volume, 1_000);
    }

    #[test]
    fn test_fetch_range_with_universe() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.insert_transactions(&[row(2, "A"), row(2, "B"), row(2, "C")]).unwrap();

        let rows = store
            .fetch_range(day(1), day(31), &Universe::symbols(["A", "C"]))
            .unwrap();
        let symbols: Vec<&str> = rows.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["A", "C"]);

        assert!(store.fetch_range(day(1), day(31), &Universe::empty()).unwrap().is_empty());
    }

    #[test]
    fn test_dates_with_time_suffix() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO transactions VALUES ('2024-01-31 00:00:00', 'A', 1, 1, 1, 1, 5.0, 1, 0, 0, 0, 0)",
                [],
            )
            .unwrap();

        let rows = store.fetch_range(day(31), day(31), &Universe::Unrestricted).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, day(31));
        assert_eq!(rows[0].volume, 5);

        let trailing = store.fetch_trailing(day(31), 6, &Universe::Unrestricted).unwrap();
        assert_eq!(trailing.len(), 1);
    }

    #[test]
    fn test_last_representable_day_as_upper_bound() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .insert_transactions(&[row(2, "A"), row(3, "A"), row(2, "B")])
            .unwrap();

        let rows = store
            .fetch_range(day(2), NaiveDate::MAX, &Universe::Unrestricted)
            .unwrap();
        assert_eq!(rows.len(), 3);

        let trailing = store
            .fetch_trailing(NaiveDate::MAX, 6, &Universe::symbols(["A"]))
            .unwrap();
        let dates: Vec<NaiveDate> = trailing.iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![day(2), day(3)]);
    }

    #[test]
    fn test_fetch_trailing_limits_per_symbol() {
        let store = SqliteStore::new_in_memory().unwrap();
        let mut rows: Vec<Transaction> = (1..=10).map(|d| row(d, "A")).collect();
        rows.extend((1..=3).map(|d| row(d, "B")));
        store.insert_transactions(&rows).unwrap();

        let trailing = store.fetch_trailing(day(8), 6, &Universe::Unrestricted).unwrap();
        let a: Vec<NaiveDate> = trailing.iter().filter(|t| t.symbol == "A").map(|t| t.date).collect();
        assert_eq!(a, (3..=8).map(day).collect::<Vec<_>>());
        assert_eq!(trailing.iter().filter(|t| t.symbol == "B").count(), 3);
    }

    #[test]
    fn test_null_numeric_is_malformed() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO transactions (date, symbol, open, close, high, low, volume, amount)
                 VALUES ('2024-01-02', 'A', 1, 1, 1, 1, 1, 1)",
                [],
            )
            .unwrap();

        let err = store
            .fetch_range(day(1), day(31), &Universe::Unrestricted)
            .unwrap_err();
        assert!(matches!(err, ExplorerError::MalformedRow { ref symbol, .. } if symbol == "A"));
        assert!(err.is_storage());
    }

    #[test]
    fn test_volume_must_be_whole() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO transactions VALUES ('2024-01-02', 'A', 1, 1, 1, 1, 1500.0, 1, 0, 0, 0, 0)",
                [],
            )
            .unwrap();
        let rows = store.fetch_range(day(1), day(31), &Universe::Unrestricted).unwrap();
        assert_eq!(rows[0].volume, 1_500);

        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO transactions VALUES ('2024-01-03', 'B', 1, 1, 1, 1, 1500.5, 1, 0, 0, 0, 0)",
                [],
            )
            .unwrap();
        let err = store
            .fetch_range(day(1), day(31), &Universe::Unrestricted)
            .unwrap_err();
        assert!(matches!(err, ExplorerError::MalformedRow { ref symbol, ref reason }
            if symbol == "B" && reason.contains("1500.5")));
    }

    #[test]
    fn test_decode_volume() {
        assert_eq!(decode_volume(&Value::Integer(i64::MAX)), Ok(i64::MAX));
        assert_eq!(decode_volume(&Value::Real(42.0)), Ok(42));
        assert!(decode_volume(&Value::Real(1e30)).is_err());
        assert!(decode_volume(&Value::Real(f64::NAN)).is_err());
        assert!(decode_volume(&Value::Null).is_err());
        assert!(decode_volume(&Value::Text("many".into())).is_err());
    }

    #[test]
    fn test_membership_queries() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.insert_index_member("SSE", "600000").unwrap();
        store.insert_index_member("SSE", "600519").unwrap();
        store.insert_index_member("SZSE", "000001").unwrap();
        store.insert_concept("Banking", "BK0002").unwrap();
        store.insert_concept("Liquor", "BK0001").unwrap();
        store.insert_concept_member("BK0002", "600000").unwrap();
        store.insert_concept_member("BK0002", "000001").unwrap();
        store.insert_concept_member("BK0001", "600519").unwrap();

        assert_eq!(store.index_options().unwrap(), vec!["SSE", "SZSE"]);
        assert_eq!(store.concept_options().unwrap(), vec!["Banking", "Liquor"]);

        let by_index = store.symbols_by_index(&["SSE".to_string()]).unwrap();
        assert_eq!(by_index.into_iter().collect::<Vec<_>>(), vec!["600000", "600519"]);

        let by_concept = store.symbols_by_concept(&["Banking".to_string()]).unwrap();
        assert_eq!(by_concept.into_iter().collect::<Vec<_>>(), vec!["000001", "600000"]);

        assert!(store.symbols_by_concept(&["Unknown".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_table_is_storage_error() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.conn().unwrap().execute_batch("DROP TABLE transactions").unwrap();

        let err = store
            .fetch_range(day(1), day(2), &Universe::Unrestricted)
            .unwrap_err();
        assert!(matches!(err, ExplorerError::Storage(_)));
    }
}

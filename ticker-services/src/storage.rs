//! Stock Storage Service
//!
//! SQLite-based append-only store for stock observations, enabling latest
//! price lookups and trailing price history.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;
use ticker_core::{LatestPrice, PricePoint, StockObservation};
use tracing::debug;

/// Stock storage service using SQLite
///
/// The connection is shared behind a mutex, so concurrent writers from the
/// scheduler and readers from request handlers are serialized here.
pub struct StockStorage {
    conn: Mutex<Connection>,
}

impl StockStorage {
    /// Open (or create) the database at `db_path`
    ///
    /// Creates the parent directory and tables if they don't exist.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Io(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory StockStorage (useful for testing)
    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize the database schema
    ///
    /// `daily_summary` is declared for per-day OHLCV rollups but nothing
    /// writes to it yet.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stocks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                price REAL NOT NULL,
                volume INTEGER,
                market_cap REAL,
                pe_ratio REAL,
                timestamp INTEGER NOT NULL
                    DEFAULT (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
            );

            CREATE INDEX IF NOT EXISTS idx_stocks_symbol_timestamp
            ON stocks(symbol, timestamp);

            CREATE TABLE IF NOT EXISTS daily_summary (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                open_price REAL,
                high_price REAL,
                low_price REAL,
                close_price REAL,
                volume INTEGER,
                date TEXT,
                UNIQUE(symbol, date)
            );
            "#,
        )?;

        Ok(())
    }

    /// Append one observation; the store stamps it with the current time
    ///
    /// Returns the row id.
    pub fn insert_observation(
        &self,
        symbol: &str,
        price: Decimal,
        volume: Option<i64>,
        market_cap: Option<Decimal>,
        pe_ratio: Option<Decimal>,
    ) -> Result<i64, StorageError> {
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO stocks (symbol, price, volume, market_cap, pe_ratio)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                symbol,
                price.to_f64().unwrap_or_default(),
                volume,
                market_cap.and_then(|v| v.to_f64()),
                pe_ratio.and_then(|v| v.to_f64()),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Latest row per symbol
    ///
    /// With `None` (or an empty slice) every symbol ever observed is
    /// returned. Exactly one row per symbol: the one with the greatest
    /// timestamp, the later insert winning a tie. Ordered by symbol.
    pub fn latest_prices(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<Vec<LatestPrice>, StorageError> {
        let conn = self.conn.lock();

        let filter = symbols.filter(|s| !s.is_empty()).unwrap_or(&[]);
        let symbol_clause = if filter.is_empty() {
            String::new()
        } else {
            let placeholders = (1..=filter.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            format!("AND s.symbol IN ({})", placeholders)
        };

        let query = format!(
            r#"
            SELECT s.symbol, s.price, s.timestamp
            FROM stocks s
            WHERE s.id = (
                SELECT s2.id
                FROM stocks s2
                WHERE s2.symbol = s.symbol
                ORDER BY s2.timestamp DESC, s2.id DESC
                LIMIT 1
            )
            {}
            ORDER BY s.symbol ASC
            "#,
            symbol_clause
        );

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params_from_iter(filter.iter()), |row| {
                Ok(LatestPrice {
                    symbol: row.get(0)?,
                    price: decimal_at(row, 1)?,
                    timestamp: timestamp_at(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Loaded {} latest prices", rows.len());
        Ok(rows)
    }

    /// Observations of `symbol` within the trailing `window_hours`, oldest first
    pub fn price_history(
        &self,
        symbol: &str,
        window_hours: u32,
    ) -> Result<Vec<PricePoint>, StorageError> {
        let conn = self.conn.lock();

        let from = Utc::now() - Duration::hours(i64::from(window_hours));

        let mut stmt = conn.prepare(
            r#"
            SELECT price, timestamp
            FROM stocks
            WHERE symbol = ?1 AND timestamp >= ?2
            ORDER BY timestamp ASC, id ASC
            "#,
        )?;

        let points = stmt
            .query_map(params![symbol, from.timestamp_millis()], |row| {
                Ok(PricePoint {
                    price: decimal_at(row, 0)?,
                    timestamp: timestamp_at(row, 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(points)
    }

    /// Most recent full row for `symbol`, including the optional fundamentals
    pub fn latest_observation(
        &self,
        symbol: &str,
    ) -> Result<Option<StockObservation>, StorageError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, symbol, price, volume, market_cap, pe_ratio, timestamp
            FROM stocks
            WHERE symbol = ?1
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )?;

        let mut rows = stmt.query_map(params![symbol], |row| {
            Ok(StockObservation {
                id: row.get(0)?,
                symbol: row.get(1)?,
                price: decimal_at(row, 2)?,
                volume: row.get(3)?,
                market_cap: optional_decimal_at(row, 4)?,
                pe_ratio: optional_decimal_at(row, 5)?,
                timestamp: timestamp_at(row, 6)?,
            })
        })?;

        let latest = rows.next().transpose()?;
        Ok(latest)
    }

    /// Get the count of observations for a symbol
    pub fn observation_count(&self, symbol: &str) -> Result<usize, StorageError> {
        let conn = self.conn.lock();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM stocks WHERE symbol = ?1",
            params![symbol],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let value: f64 = row.get(idx)?;
    Ok(Decimal::try_from(value).unwrap_or_default())
}

fn optional_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let value: Option<f64> = row.get(idx)?;
    Ok(value.and_then(|v| Decimal::try_from(v).ok()))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    Ok(DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now))
}

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),
}

//! Stored stock observations and their query projections

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Symbols polled by the fetcher unless overridden by configuration
pub const DEFAULT_SYMBOLS: [&str; 13] = [
    "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "META", "NFLX", "NVDA", "MCRB", "PAY", "SOL-USD",
    "USDC-USD", "WBTC-USD",
];

/// A point-in-time snapshot of one symbol, as persisted
///
/// Rows are append-only. The store assigns `timestamp` at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockObservation {
    pub id: i64,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub volume: Option<i64>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub market_cap: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub pe_ratio: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// Most recent price for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestPrice {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// One entry of a stored price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

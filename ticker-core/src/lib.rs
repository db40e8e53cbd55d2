//! Core types for the stock dashboard
//!
//! This crate defines the shared data structures used across the workspace,
//! including stored observations, provider price bars, the derived market
//! summary, and the market data provider abstraction.

pub mod error;
pub mod market;
pub mod provider;
pub mod stock;
pub mod summary;

pub use error::{TickerError, TickerResult};
pub use market::{BarInterval, HistoryPeriod, PriceBar, TickerInfo};
pub use provider::{MarketDataProvider, StaticProvider};
pub use stock::{LatestPrice, PricePoint, StockObservation, DEFAULT_SYMBOLS};
pub use summary::{day_change, MarketSummary, StockSummary, TrendingStocks};

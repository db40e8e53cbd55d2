//! Services for the stock dashboard
//!
//! This crate provides the SQLite-backed observation store, the fetcher that
//! polls the market data provider, the background scheduler that drives it,
//! and the registry of live WebSocket clients.

pub mod fetcher;
pub mod scheduler;
pub mod storage;
pub mod websocket;

pub use fetcher::{FetcherConfig, FetcherError, StockFetcher};
pub use scheduler::{FetchScheduler, SchedulerConfig, SchedulerHandle};
pub use storage::{StockStorage, StorageError};
pub use websocket::{ClientId, ConnectionRegistry};

//! Yahoo Finance integration
//!
//! Implements [`ticker_core::MarketDataProvider`] on top of the public
//! chart and quote endpoints. The quote endpoint needs a session cookie
//! and crumb, which the client obtains on first use and caches.

pub mod client;
pub mod types;

pub use client::YahooClient;
pub use types::{ChartResponse, QuoteResponse, YAHOO_API_BASE, YAHOO_COOKIE_URL};

//! Stock Fetcher Service
//!
//! Polls the market data provider for the configured symbols, records one
//! observation per symbol per cycle, and derives the market summary from the
//! latest stored prices.

use std::sync::Arc;
use std::time::Duration;
use ticker_core::{
    day_change, BarInterval, HistoryPeriod, MarketDataProvider, MarketSummary, PriceBar,
    StockSummary, TickerError, TickerInfo, TrendingStocks, DEFAULT_SYMBOLS,
};
use tracing::{debug, error, info, warn};

use crate::storage::{StockStorage, StorageError};

/// Configuration for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Symbols polled on every cycle, in order
    pub symbols: Vec<String>,
    /// Pause between consecutive symbols to stay under upstream rate limits
    pub request_delay: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            request_delay: Duration::from_secs(1),
        }
    }
}

/// Fetches quotes from the provider and reads them back as summaries
pub struct StockFetcher {
    provider: Arc<dyn MarketDataProvider>,
    storage: Arc<StockStorage>,
    config: FetcherConfig,
}

impl StockFetcher {
    /// Create a new StockFetcher
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        storage: Arc<StockStorage>,
        config: FetcherConfig,
    ) -> Self {
        Self {
            provider,
            storage,
            config,
        }
    }

    /// Symbols this fetcher polls
    pub fn symbols(&self) -> &[String] {
        &self.config.symbols
    }

    /// Record a fresh observation for every configured symbol
    ///
    /// Fundamentals are optional: a failed info lookup is logged and the
    /// price is stored without them. A history error aborts the rest of the
    /// cycle and is logged; rows already written in this cycle are kept.
    /// Storage errors propagate.
    /// Returns the number of rows written.
    pub async fn fetch_real_time_data(&self) -> Result<usize, FetcherError> {
        let mut stored = 0;

        for (i, symbol) in self.config.symbols.iter().enumerate() {
            if i > 0 && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }

            match self.fetch_symbol(symbol).await {
                Ok(true) => stored += 1,
                Ok(false) => debug!("No intraday data for {}, skipping", symbol),
                Err(FetcherError::Provider(e)) => {
                    error!(
                        "Error fetching data from {} at {}: {} ({} of {} symbols stored)",
                        self.provider.name(),
                        symbol,
                        e,
                        stored,
                        self.config.symbols.len()
                    );
                    return Ok(stored);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(stored)
    }

    /// Fetch and store one symbol. `Ok(false)` means the provider had no bars.
    async fn fetch_symbol(&self, symbol: &str) -> Result<bool, FetcherError> {
        let info = match self.provider.info(symbol).await {
            Ok(info) => info,
            Err(e) => {
                warn!("No fundamentals for {} from {}: {}", symbol, self.provider.name(), e);
                TickerInfo::default()
            }
        };
        let bars = self
            .provider
            .history(symbol, HistoryPeriod::OneDay, BarInterval::OneMinute)
            .await?;

        let Some(last) = bars.last() else {
            return Ok(false);
        };

        self.storage.insert_observation(
            symbol,
            last.close,
            Some(last.volume),
            info.market_cap,
            info.pe_ratio,
        )?;
        info!("Updated {}: ${:.2}", symbol, last.close);

        Ok(true)
    }

    /// Daily bars for `symbol` over `period`; empty if the provider fails
    pub async fn fetch_historical_data(&self, symbol: &str, period: HistoryPeriod) -> Vec<PriceBar> {
        match self
            .provider
            .history(symbol, period, BarInterval::OneDay)
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                error!("Error fetching historical data for {}: {}", symbol, e);
                Vec::new()
            }
        }
    }

    /// Latest stored price per configured symbol with its day-over-day change
    ///
    /// The previous close comes from a live two-day history request per
    /// symbol, so every call costs one upstream request per stored symbol.
    pub async fn get_market_summary(&self) -> Result<MarketSummary, FetcherError> {
        let latest = self.storage.latest_prices(Some(&self.config.symbols))?;

        let mut stocks = Vec::with_capacity(latest.len());
        for row in latest {
            let history = self
                .fetch_historical_data(&row.symbol, HistoryPeriod::TwoDays)
                .await;
            let (change, change_percent) = day_change(row.price, &history);

            stocks.push(StockSummary {
                symbol: row.symbol,
                price: row.price,
                change,
                change_percent,
                timestamp: row.timestamp,
            });
        }

        Ok(MarketSummary::new(stocks))
    }

    /// Biggest movers of the current market summary
    pub async fn get_trending(&self) -> Result<TrendingStocks, FetcherError> {
        let summary = self.get_market_summary().await?;
        Ok(TrendingStocks::from_stocks(summary.stocks))
    }
}

/// Errors that can occur during fetching
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Provider error: {0}")]
    Provider(#[from] TickerError),
}

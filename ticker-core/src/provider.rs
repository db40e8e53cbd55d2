//! Market data provider abstraction
//!
//! The fetcher only needs two things from an upstream source: an OHLCV
//! history for a symbol and a small set of fundamentals. Each upstream
//! (Yahoo Finance, an in-memory fixture) implements this trait.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{TickerError, TickerResult};
use crate::market::{BarInterval, HistoryPeriod, PriceBar, TickerInfo};

/// Upstream source of quotes, history and fundamentals
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// OHLCV bars for `symbol` over `period`, oldest first
    ///
    /// An unknown symbol or a closed market may legitimately yield no bars.
    async fn history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
        interval: BarInterval,
    ) -> TickerResult<Vec<PriceBar>>;

    /// Fundamentals for `symbol`
    async fn info(&self, symbol: &str) -> TickerResult<TickerInfo>;
}

/// Provider serving fixed in-memory data
///
/// Intraday (`1m`) and daily (`1d`) bars are kept separately; the requested
/// period is ignored. Symbols marked as failing return a network error from
/// every call; symbols marked with an info failure only fail `info`.
#[derive(Debug, Default)]
pub struct StaticProvider {
    intraday: HashMap<String, Vec<PriceBar>>,
    daily: HashMap<String, Vec<PriceBar>>,
    info: HashMap<String, TickerInfo>,
    failing: HashSet<String>,
    failing_info: HashSet<String>,
    history_calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the one-minute bars returned for `symbol`
    pub fn with_intraday(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.intraday.insert(symbol.to_string(), bars);
        self
    }

    /// Set the daily bars returned for `symbol`
    pub fn with_daily(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.daily.insert(symbol.to_string(), bars);
        self
    }

    /// Set the fundamentals returned for `symbol`
    pub fn with_info(mut self, symbol: &str, info: TickerInfo) -> Self {
        self.info.insert(symbol.to_string(), info);
        self
    }

    /// Make every call for `symbol` fail
    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    /// Make only the fundamentals call fail for `symbol`
    pub fn with_info_failure(mut self, symbol: &str) -> Self {
        self.failing_info.insert(symbol.to_string());
        self
    }

    /// Number of history requests served so far
    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    fn check(&self, symbol: &str) -> TickerResult<()> {
        if self.failing.contains(symbol) {
            return Err(TickerError::network(format!(
                "static provider configured to fail for {}",
                symbol
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn history(
        &self,
        symbol: &str,
        _period: HistoryPeriod,
        interval: BarInterval,
    ) -> TickerResult<Vec<PriceBar>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.check(symbol)?;

        let bars = match interval {
            BarInterval::OneMinute => self.intraday.get(symbol),
            BarInterval::OneDay => self.daily.get(symbol),
        };
        Ok(bars.cloned().unwrap_or_default())
    }

    async fn info(&self, symbol: &str) -> TickerResult<TickerInfo> {
        self.check(symbol)?;
        if self.failing_info.contains(symbol) {
            return Err(TickerError::api(format!("no fundamentals for {}", symbol)));
        }
        Ok(self.info.get(symbol).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn bar(close: rust_decimal::Decimal) -> PriceBar {
        PriceBar {
            timestamp: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 10,
        }
    }

    #[tokio::test]
    async fn test_static_provider_serves_by_interval() {
        let provider = StaticProvider::new()
            .with_intraday("AAPL", vec![bar(dec!(190.5))])
            .with_daily("AAPL", vec![bar(dec!(188)), bar(dec!(190))]);

        let intraday = provider
            .history("AAPL", HistoryPeriod::OneDay, BarInterval::OneMinute)
            .await
            .unwrap();
        let daily = provider
            .history("AAPL", HistoryPeriod::TwoDays, BarInterval::OneDay)
            .await
            .unwrap();
        let unknown = provider
            .history("MSFT", HistoryPeriod::TwoDays, BarInterval::OneDay)
            .await
            .unwrap();

        assert_eq!(intraday.len(), 1);
        assert_eq!(daily.len(), 2);
        assert!(unknown.is_empty());
        assert_eq!(provider.history_calls(), 3);
    }

    #[tokio::test]
    async fn test_static_provider_failure() {
        let provider = StaticProvider::new().with_failure("BAD");

        assert!(provider.info("BAD").await.is_err());
        assert!(provider
            .history("BAD", HistoryPeriod::OneDay, BarInterval::OneMinute)
            .await
            .is_err());
        assert_eq!(provider.info("GOOD").await.unwrap(), TickerInfo::default());

        let provider = StaticProvider::new()
            .with_intraday("AAPL", vec![bar(dec!(190))])
            .with_info_failure("AAPL");
        assert!(provider.info("AAPL").await.is_err());
        assert_eq!(
            provider
                .history("AAPL", HistoryPeriod::OneDay, BarInterval::OneMinute)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}

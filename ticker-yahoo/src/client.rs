//! Yahoo Finance API client
//!
//! Provides OHLCV history via the chart endpoint and fundamentals via the
//! quote endpoint. The quote endpoint rejects requests without a session
//! cookie and matching crumb, so both are fetched lazily and cached.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use ticker_core::{
    BarInterval, HistoryPeriod, MarketDataProvider, PriceBar, TickerError, TickerInfo,
    TickerResult,
};
use tracing::{debug, instrument, warn};

use crate::types::{ChartResponse, QuoteResponse, YAHOO_COOKIE_URL};

/// Yahoo rejects requests without a browser-like user agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Yahoo Finance API client
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: Arc<Mutex<Option<String>>>,
}

impl YahooClient {
    /// Create a client against `base_url` (the public API or a mirror)
    pub fn with_base_url(base_url: impl Into<String>) -> TickerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| TickerError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookie_url: YAHOO_COOKIE_URL.to_string(),
            crumb: Arc::new(Mutex::new(None)),
        })
    }

    /// Use a different page to obtain the session cookie
    pub fn with_cookie_url(mut self, cookie_url: impl Into<String>) -> Self {
        self.cookie_url = cookie_url.into();
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Crumb for the current session, performing the cookie handshake once
    async fn crumb(&self) -> TickerResult<String> {
        let cached = self.crumb.lock().clone();
        if let Some(crumb) = cached {
            return Ok(crumb);
        }

        // Any status is fine here; only the Set-Cookie header matters
        self.client
            .get(&self.cookie_url)
            .send()
            .await
            .map_err(|e| TickerError::network(format!("Failed to fetch session cookie: {}", e)))?;

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TickerError::network(format!("Failed to fetch crumb: {}", e)))?;

        if !response.status().is_success() {
            return Err(TickerError::api(format!(
                "Yahoo crumb request failed ({})",
                response.status()
            )));
        }

        let crumb = response
            .text()
            .await
            .map_err(|e| TickerError::parse(format!("Failed to read crumb: {}", e)))?
            .trim()
            .to_string();

        if crumb.is_empty() || crumb.contains('<') {
            return Err(TickerError::api("Yahoo returned an invalid crumb"));
        }

        debug!("Obtained Yahoo crumb");
        *self.crumb.lock() = Some(crumb.clone());
        Ok(crumb)
    }

    /// Fetch the chart series for a symbol
    #[instrument(skip(self))]
    pub async fn get_chart(
        &self,
        symbol: &str,
        period: HistoryPeriod,
        interval: BarInterval,
    ) -> TickerResult<ChartResponse> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!("Fetching Yahoo chart from: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("range", period.as_str()), ("interval", interval.as_str())])
            .send()
            .await
            .map_err(|e| TickerError::network(format!("Failed to fetch chart: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(TickerError::not_found(symbol.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TickerError::api(format!(
                "Yahoo chart API error ({}): {}",
                status, body
            )));
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| TickerError::parse(format!("Failed to parse chart response: {}", e)))?;

        if let Some(error) = &chart.chart.error {
            return Err(TickerError::api(format!("Yahoo chart error: {}", error)));
        }

        Ok(chart)
    }

    /// Fetch the quote summary for a symbol
    #[instrument(skip(self))]
    pub async fn get_quote(&self, symbol: &str) -> TickerResult<QuoteResponse> {
        let crumb = self.crumb().await?;
        let url = format!("{}/v7/finance/quote", self.base_url);
        debug!("Fetching Yahoo quote for: {}", symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("symbols", symbol), ("crumb", crumb.as_str())])
            .send()
            .await
            .map_err(|e| TickerError::network(format!("Failed to fetch quote: {}", e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Yahoo rejected the crumb, refreshing on next request");
            *self.crumb.lock() = None;
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TickerError::api(format!(
                "Yahoo quote API error ({}): {}",
                status, body
            )));
        }

        let quote: QuoteResponse = response
            .json()
            .await
            .map_err(|e| TickerError::parse(format!("Failed to parse quote response: {}", e)))?;

        if let Some(error) = &quote.quote_response.error {
            return Err(TickerError::api(format!("Yahoo quote error: {}", error)));
        }

        Ok(quote)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
        interval: BarInterval,
    ) -> TickerResult<Vec<PriceBar>> {
        let chart = self.get_chart(symbol, period, interval).await?;
        Ok(chart.into_bars())
    }

    async fn info(&self, symbol: &str) -> TickerResult<TickerInfo> {
        let quote = self.get_quote(symbol).await?;

        let info = quote
            .quote_response
            .result
            .iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .map(|q| q.to_info())
            .unwrap_or_default();

        Ok(info)
    }
}

//! Yahoo Finance API response types
//!
//! These types mirror the chart and quote endpoint payloads and are converted
//! to ticker-core types for use in the application.

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use ticker_core::{PriceBar, TickerInfo};

/// Base URL for the public Yahoo Finance API
pub const YAHOO_API_BASE: &str = "https://query1.finance.yahoo.com";

/// Host whose response sets the session cookie the crumb is tied to
pub const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";

/// `GET /v8/finance/chart/{symbol}`
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    /// Bar start times in epoch seconds; absent when the range has no data
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

/// Parallel OHLCV columns. Yahoo emits `null` for bars without trades.
#[derive(Debug, Default, Deserialize)]
pub struct QuoteSeries {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => write!(f, "{}", self.code),
        }
    }
}

impl ChartResponse {
    /// Flatten the columnar series into bars
    ///
    /// Bars with a missing close are dropped; other missing prices fall back
    /// to the close and a missing volume counts as zero.
    pub fn into_bars(self) -> Vec<PriceBar> {
        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Vec::new();
        };
        let series = result.indicators.quote.into_iter().next().unwrap_or_default();

        result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let close = to_decimal(series.close.get(i).copied().flatten())?;
                let column = |values: &[Option<f64>]| {
                    to_decimal(values.get(i).copied().flatten()).unwrap_or(close)
                };

                Some(PriceBar {
                    timestamp: DateTime::from_timestamp(ts, 0)?,
                    open: column(&series.open),
                    high: column(&series.high),
                    low: column(&series.low),
                    close,
                    volume: series.volume.get(i).copied().flatten().unwrap_or(0),
                })
            })
            .collect()
    }
}

/// `GET /v7/finance/quote?symbols=`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub quote_response: QuoteResult,
}

#[derive(Debug, Deserialize)]
pub struct QuoteResult {
    #[serde(default)]
    pub result: Vec<QuoteSummary>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub symbol: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default, rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
}

impl QuoteSummary {
    pub fn to_info(&self) -> TickerInfo {
        TickerInfo {
            market_cap: to_decimal(self.market_cap),
            pe_ratio: to_decimal(self.trailing_pe),
        }
    }
}

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(|v| Decimal::try_from(v).ok())
}

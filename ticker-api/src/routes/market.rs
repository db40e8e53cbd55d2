//! Market data API endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use ticker_core::{LatestPrice, MarketSummary, PricePoint, TrendingStocks};
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// Trailing window of stored history returned per symbol
const HISTORY_WINDOW_HOURS: u32 = 24;

/// Response for a single symbol
#[derive(Debug, Serialize)]
pub struct StockDetailResponse {
    pub symbol: String,
    /// Null when the symbol has never been observed
    pub latest: Option<LatestPrice>,
    pub history: Vec<PricePoint>,
}

/// Create market routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/market-summary", get(get_market_summary))
        .route("/stock/{symbol}", get(get_stock))
        .route("/stocks/trending", get(get_trending))
}

/// Current summary of every tracked symbol
async fn get_market_summary(
    State(state): State<AppState>,
) -> Result<Json<MarketSummary>, ApiError> {
    let summary = state.fetcher.get_market_summary().await?;
    info!("Returning market summary for {} stocks", summary.total_stocks);
    Ok(Json(summary))
}

/// Latest observation and 24h history for one symbol
async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockDetailResponse>, ApiError> {
    let symbol = symbol.to_uppercase();

    let latest = state
        .storage
        .latest_prices(Some(std::slice::from_ref(&symbol)))?
        .into_iter()
        .next();
    let history = state.storage.price_history(&symbol, HISTORY_WINDOW_HOURS)?;

    Ok(Json(StockDetailResponse {
        symbol,
        latest,
        history,
    }))
}

/// Biggest movers by absolute percentage change
async fn get_trending(State(state): State<AppState>) -> Result<Json<TrendingStocks>, ApiError> {
    let trending = state.fetcher.get_trending().await?;
    Ok(Json(trending))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use ticker_core::{PriceBar, StaticProvider};

    use crate::routes::router;
    use crate::routes::test_support::{get, state};

    fn daily(closes: &[Decimal]) -> Vec<PriceBar> {
        closes
            .iter()
            .map(|&close| PriceBar {
                timestamp: Utc::now(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_unknown_stock_has_null_latest() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(StaticProvider::new(), &["AAPL"], dir.path()));

        let (status, body) = get(app, "/api/stock/zzzz").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["symbol"], "ZZZZ");
        assert!(json["latest"].is_null());
        assert_eq!(json["history"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_stock_detail_uppercases_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(StaticProvider::new(), &["AAPL"], dir.path());
        state
            .storage
            .insert_observation("AAPL", dec!(190.5), Some(100), None, None)
            .unwrap();
        state
            .storage
            .insert_observation("AAPL", dec!(191), Some(100), None, None)
            .unwrap();

        let (status, body) = get(router(state), "/api/stock/aapl").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["latest"]["symbol"], "AAPL");
        assert_eq!(json["latest"]["price"], serde_json::json!(191.0));
        assert_eq!(json["history"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_market_summary_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StaticProvider::new().with_daily("MSFT", daily(&[dec!(400), dec!(404)]));
        let state = state(provider, &["MSFT", "AAPL"], dir.path());
        state
            .storage
            .insert_observation("MSFT", dec!(420), None, None, None)
            .unwrap();

        let (status, body) = get(router(state), "/api/market-summary").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["total_stocks"], 1);
        assert_eq!(json["stocks"][0]["symbol"], "MSFT");
        assert_eq!(json["stocks"][0]["change"], serde_json::json!(20.0));
        assert_eq!(json["stocks"][0]["change_percent"], serde_json::json!(5.0));
        assert!(json["last_update"].is_string());
    }

    #[tokio::test]
    async fn test_trending_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StaticProvider::new()
            .with_daily("AAPL", daily(&[dec!(100), dec!(100)]))
            .with_daily("TSLA", daily(&[dec!(100), dec!(100)]));
        let state = state(provider, &["AAPL", "TSLA"], dir.path());
        state
            .storage
            .insert_observation("AAPL", dec!(101), None, None, None)
            .unwrap();
        state
            .storage
            .insert_observation("TSLA", dec!(92), None, None, None)
            .unwrap();

        let (status, body) = get(router(state), "/api/stocks/trending").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["trending"][0]["symbol"], "TSLA");
        assert_eq!(json["trending"][1]["symbol"], "AAPL");
        assert_eq!(json["gainers"].as_array().unwrap().len(), 1);
        assert_eq!(json["losers"][0]["symbol"], "TSLA");
    }
}

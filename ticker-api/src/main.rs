//! Stock Dashboard API Server
//!
//! Polls Yahoo Finance on a timer, stores snapshots in SQLite, and serves
//! the latest data over HTTP and WebSocket to the dashboard.

mod config;
mod error;
mod routes;

use axum::http::{header, Method};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use ticker_services::{
    ConnectionRegistry, FetchScheduler, FetcherConfig, SchedulerConfig, StockFetcher,
    StockStorage,
};
use ticker_yahoo::YahooClient;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<StockFetcher>,
    pub storage: Arc<StockStorage>,
    pub connections: Arc<ConnectionRegistry>,
    /// Directory holding the dashboard's `index.html` and static assets
    pub dashboard_dir: PathBuf,
    /// Time between market summaries pushed to each WebSocket client
    pub ws_push_interval: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ticker_api=debug")),
        )
        .init();

    info!("Starting Stock Dashboard API");

    let config = AppConfig::from_env();

    let provider = Arc::new(YahooClient::with_base_url(config.yahoo_base_url.clone())?);

    info!("Initializing stock storage at: {}", config.db_path.display());
    let storage = Arc::new(StockStorage::open(&config.db_path)?);

    let fetcher = Arc::new(StockFetcher::new(
        provider,
        storage.clone(),
        FetcherConfig {
            symbols: config.symbols.clone(),
            ..FetcherConfig::default()
        },
    ));

    let connections = Arc::new(ConnectionRegistry::new());

    // Start background fetching
    let scheduler = FetchScheduler::new(
        fetcher.clone(),
        SchedulerConfig {
            interval: config.fetch_interval,
        },
    )
    .with_broadcast(connections.clone())
    .start();

    let state = AppState {
        fetcher,
        storage,
        connections,
        dashboard_dir: config.dashboard_dir.clone(),
        ws_push_interval: config.ws_push_interval,
    };

    // Configure CORS for the dashboard
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    info!("Stock Dashboard API stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

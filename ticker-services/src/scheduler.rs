//! Fetch Scheduler
//!
//! Background timer that drives [`StockFetcher::fetch_real_time_data`]
//! independently of request traffic.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::fetcher::StockFetcher;
use crate::websocket::ConnectionRegistry;

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between fetch cycles; the first cycle runs one interval after start
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(120),
        }
    }
}

/// Periodically refreshes stored observations
pub struct FetchScheduler {
    fetcher: Arc<StockFetcher>,
    connections: Option<Arc<ConnectionRegistry>>,
    config: SchedulerConfig,
}

impl FetchScheduler {
    /// Create a new FetchScheduler
    pub fn new(fetcher: Arc<StockFetcher>, config: SchedulerConfig) -> Self {
        Self {
            fetcher,
            connections: None,
            config,
        }
    }

    /// Push a fresh summary to every registered client after each cycle
    pub fn with_broadcast(mut self, connections: Arc<ConnectionRegistry>) -> Self {
        self.connections = Some(connections);
        self
    }

    /// Spawn the timer loop
    ///
    /// Ticks missed while a cycle is still running are skipped, never
    /// replayed.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        info!(
            "Starting fetch scheduler with {}s interval for {} symbols",
            self.config.interval.as_secs(),
            self.fetcher.symbols().len()
        );

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.run_once().await,
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Fetch scheduler stopped");
        });

        SchedulerHandle { shutdown_tx, task }
    }

    /// Run a single fetch cycle
    pub async fn run_once(&self) {
        debug!("Running scheduled fetch");

        let stored = match self.fetcher.fetch_real_time_data().await {
            Ok(stored) => {
                info!("Fetch cycle complete: {} observations stored", stored);
                stored
            }
            Err(e) => {
                error!("Fetch cycle failed: {}", e);
                return;
            }
        };

        let Some(connections) = &self.connections else {
            return;
        };
        if stored == 0 || connections.is_empty() {
            return;
        }

        match self.fetcher.get_market_summary().await {
            Ok(summary) => match serde_json::to_string(&summary) {
                Ok(json) => {
                    let delivered = connections.broadcast(&json);
                    debug!("Broadcast summary to {} clients", delivered);
                }
                Err(e) => error!("Failed to serialize summary: {}", e),
            },
            Err(e) => warn!("Skipping broadcast, summary unavailable: {}", e),
        }
    }
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the timer and wait for an in-flight cycle to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!("Fetch scheduler task failed: {}", e);
        }
    }
}

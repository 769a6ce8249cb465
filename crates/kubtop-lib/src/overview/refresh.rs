//! Periodic overview refresh
//!
//! Runs [`Aggregator::overview`] on an interval, storing successes in an
//! [`OverviewCache`] and keeping the previous overview when a refresh fails.
//! Refreshes triggered from elsewhere go through the same mutex, so at most
//! one query is in flight per aggregator.

use super::{Aggregator, OverviewCache, OverviewSnapshot, QueryConfig};
use crate::collector::CommandRunner;
use crate::error::KubtopError;
use crate::health::{components, HealthRegistry};
use crate::models::AggregatedNode;
use crate::observability::StructuredLogger;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Aggregator shared between the refresh loop and on-demand callers
pub type SharedAggregator<R> = Arc<Mutex<Aggregator<R>>>;

/// Failure of one refresh cycle
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Query(#[from] KubtopError),

    #[error("overview task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Refresh loop settings
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between refreshes (default: 5 seconds)
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Run one overview query on the blocking pool, holding the aggregator lock
/// for the whole query.
pub async fn refresh_once<R>(
    aggregator: &SharedAggregator<R>,
    query: &QueryConfig,
) -> Result<Vec<AggregatedNode>, RefreshError>
where
    R: CommandRunner + 'static,
{
    let mut guard = Arc::clone(aggregator).lock_owned().await;
    let query = query.clone();
    let nodes = tokio::task::spawn_blocking(move || guard.overview(&query)).await??;
    Ok(nodes)
}

/// Periodically refreshes the overview cache
pub struct RefreshLoop<R> {
    aggregator: SharedAggregator<R>,
    query: QueryConfig,
    cache: OverviewCache,
    config: RefreshConfig,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
    updates: Option<mpsc::Sender<OverviewSnapshot>>,
}

impl<R: CommandRunner + 'static> RefreshLoop<R> {
    pub fn new(aggregator: SharedAggregator<R>, query: QueryConfig, cache: OverviewCache) -> Self {
        Self {
            aggregator,
            query,
            cache,
            config: RefreshConfig::default(),
            health: None,
            logger: None,
            updates: None,
        }
    }

    pub fn config(mut self, config: RefreshConfig) -> Self {
        self.config = config;
        self
    }

    /// Report aggregator health after every cycle
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Receive the snapshot after every cycle
    pub fn subscribe(&mut self, buffer: usize) -> mpsc::Receiver<OverviewSnapshot> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.updates = Some(tx);
        rx
    }

    /// Refresh until `shutdown` fires. The first refresh runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            kubeconfig = %self.query.kubeconfig,
            "Starting overview refresh loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down overview refresh loop");
                    break;
                }
            }
        }
    }

    /// One refresh: query, then update cache, health and subscribers
    pub async fn cycle(&self) {
        let start = Instant::now();

        match refresh_once(&self.aggregator, &self.query).await {
            Ok(nodes) => {
                let workloads: usize = nodes.iter().map(|n| n.workloads.len()).sum();
                if let Some(logger) = &self.logger {
                    logger.log_refresh(nodes.len(), workloads, start.elapsed());
                }
                self.cache.store(nodes).await;
                if let Some(health) = &self.health {
                    health.set_healthy(components::AGGREGATOR).await;
                    health.set_ready(true).await;
                }
            }
            Err(e) => {
                let message = e.to_string();
                if let Some(logger) = &self.logger {
                    logger.log_refresh_failure(&message);
                }
                self.cache.record_failure(message.clone()).await;
                if let Some(health) = &self.health {
                    if self.cache.snapshot().await.has_data() {
                        let reason = format!("serving stale overview: {message}");
                        health.set_degraded(components::AGGREGATOR, reason).await;
                    } else {
                        health.set_unhealthy(components::AGGREGATOR, message).await;
                    }
                }
            }
        }

        if let Some(tx) = &self.updates {
            let snapshot = self.cache.snapshot().await;
            if tx.send(snapshot).await.is_err() {
                debug!("Overview subscriber went away");
            }
        }

        let elapsed = start.elapsed();
        if elapsed > self.config.interval {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                interval_ms = self.config.interval.as_millis(),
                "Overview refresh took longer than the refresh interval"
            );
        }
    }
}

//! kubtop agent
//!
//! Refreshes the cluster overview on an interval and serves the last good
//! one at `/api/v1/overview`, next to `/healthz`, `/readyz` and `/metrics`.

use anyhow::Result;
use kubtop_agent::{api, config::AgentConfig};
use kubtop_lib::health::components;
use kubtop_lib::overview::{RefreshConfig, RefreshLoop};
use kubtop_lib::{
    Aggregator, OverviewCache, OverviewMetrics, ProcessRunner, StructuredLogger,
};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting kubtop-agent");

    let config = AgentConfig::load()?;
    info!(
        kubeconfig = %config.kubeconfig,
        all_namespaces = config.all_namespaces,
        refresh_interval_secs = config.refresh_interval_secs,
        "Agent configured"
    );

    let health_registry = api::startup_health().await;

    let metrics = OverviewMetrics::new();

    let logger = StructuredLogger::new(config.cluster_name());
    logger.log_startup(AGENT_VERSION, &config.tool);

    let aggregator = Aggregator::new(ProcessRunner::new(), config.tool.clone())
        .with_lookup(config.lookup())
        .with_metrics(metrics.clone());
    let cache = OverviewCache::new();

    let refresher = RefreshLoop::new(Arc::new(Mutex::new(aggregator)), config.query(), cache.clone())
        .config(RefreshConfig {
            interval: config.refresh_interval(),
        })
        .health(health_registry.clone())
        .logger(logger.clone());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let refresh_handle = tokio::spawn(refresher.run(shutdown_rx));

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), cache));
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let reason = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            "SIGINT received"
        }
        served = &mut api_handle => {
            match served {
                Ok(Ok(())) => "API server stopped",
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    health_registry
                        .set_unhealthy(components::API, e.to_string())
                        .await;
                    "API server failed"
                }
                Err(e) => {
                    error!(error = %e, "API server task panicked");
                    "API server task panicked"
                }
            }
        }
    };

    logger.log_shutdown(reason);
    let _ = shutdown_tx.send(());
    if let Err(e) = refresh_handle.await {
        error!(error = %e, "Refresh loop panicked");
    }
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}

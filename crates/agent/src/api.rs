//! HTTP API for the overview, health checks and Prometheus metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use kubtop_lib::health::components;
use kubtop_lib::{ComponentStatus, HealthRegistry, OverviewCache, OverviewSnapshot};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub cache: OverviewCache,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, cache: OverviewCache) -> Self {
        Self {
            health_registry,
            cache,
        }
    }
}

/// Health registry for a freshly started agent: the API is up, the
/// aggregator stays unhealthy until its first overview
pub async fn startup_health() -> HealthRegistry {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::API).await;
    health_registry
        .set_unhealthy(components::AGGREGATOR, "No overview fetched yet")
        .await;
    health_registry
}

/// Cached overview plus how old it is
#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    #[serde(flatten)]
    pub snapshot: OverviewSnapshot,
    /// Seconds since the last successful refresh
    pub age_seconds: Option<i64>,
}

impl From<OverviewSnapshot> for OverviewResponse {
    fn from(snapshot: OverviewSnapshot) -> Self {
        let age_seconds = snapshot
            .refreshed_at
            .map(|t| (Utc::now() - t).num_seconds().max(0));
        Self {
            snapshot,
            age_seconds,
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // Serving a stale overview
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Last known good overview - 503 until the first refresh succeeds
async fn overview(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.cache.snapshot().await;

    let status_code = if snapshot.has_data() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(OverviewResponse::from(snapshot)))
}

/// One node of the cached overview
async fn node(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> impl IntoResponse {
    let snapshot = state.cache.snapshot().await;

    match snapshot.nodes.into_iter().find(|n| n.name == name) {
        Some(node) => (StatusCode::OK, Json(serde_json::json!(node))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("node {} not in overview", name) })),
        ),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/overview", get(overview))
        .route("/api/v1/nodes/:name", get(node))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

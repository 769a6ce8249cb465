//! Cluster overview library for kubtop
//!
//! This crate provides the core functionality for:
//! - Running `kubectl top` / `kubectl get pods` and parsing their output
//! - Joining node usage, pod usage and pod descriptions into a node tree
//! - Periodic refresh with a last-known-good cache
//! - Health checks and observability

pub mod collector;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod overview;

pub use collector::{CommandRunner, EmptyReportPolicy, ProcessRunner, Scope};
pub use error::{KubtopError, ParseError, RunError, Stage};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{OverviewMetrics, StructuredLogger};
pub use overview::{Aggregator, OverviewCache, OverviewSnapshot, QueryConfig, DEFAULT_TOOL};

/// Fetch the node tree for `kubeconfig` with `kubectl` on `PATH`.
///
/// Runs the three reports one after another and fails as a whole if any of
/// them fails.
pub fn fetch_overview(
    kubeconfig: &str,
    all_namespaces: bool,
) -> Result<Vec<AggregatedNode>, KubtopError> {
    let query = QueryConfig::new(kubeconfig).scope(Scope::from_all_namespaces(all_namespaces));
    Aggregator::new(ProcessRunner::new(), DEFAULT_TOOL).overview(&query)
}

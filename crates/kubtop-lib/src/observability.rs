//! Observability for overview queries
//!
//! Provides:
//! - Prometheus metrics (query latency, failures per stage, overview size,
//!   join anomalies)
//! - Structured event logging with tracing

use crate::models::AggregatedNode;
use crate::overview::JoinStats;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Histogram buckets for query latency (in seconds). A query runs three
/// `kubectl` processes, so the range is much wider than for in-process work.
const QUERY_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<OverviewMetricsInner> = OnceLock::new();

struct OverviewMetricsInner {
    query_latency_seconds: Histogram,
    query_errors: IntCounterVec,
    nodes_reported: IntGauge,
    workloads_reported: IntGauge,
    workloads_dropped: IntCounter,
    workloads_without_usage: IntCounter,
    duplicate_nodes: IntCounter,
}

impl OverviewMetricsInner {
    fn new() -> Self {
        Self {
            query_latency_seconds: register_histogram!(
                "kubtop_query_latency_seconds",
                "Time spent fetching and joining the three cluster reports",
                QUERY_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register query_latency_seconds"),

            query_errors: register_int_counter_vec!(
                "kubtop_query_errors_total",
                "Overview queries aborted, by the stage that failed",
                &["stage"]
            )
            .expect("Failed to register query_errors"),

            nodes_reported: register_int_gauge!(
                "kubtop_nodes",
                "Nodes in the most recent overview"
            )
            .expect("Failed to register nodes"),

            workloads_reported: register_int_gauge!(
                "kubtop_workloads",
                "Pods placed under a node in the most recent overview"
            )
            .expect("Failed to register workloads"),

            workloads_dropped: register_int_counter!(
                "kubtop_workloads_dropped_total",
                "Pods dropped because their node was missing from the node report"
            )
            .expect("Failed to register workloads_dropped"),

            workloads_without_usage: register_int_counter!(
                "kubtop_workloads_without_usage_total",
                "Pods reported with zero usage because the usage report had no row for them"
            )
            .expect("Failed to register workloads_without_usage"),

            duplicate_nodes: register_int_counter!(
                "kubtop_duplicate_node_rows_total",
                "Repeated rows in the node report, ignored after the first"
            )
            .expect("Failed to register duplicate_nodes"),
        }
    }
}

/// Handle to the process-wide overview metrics.
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone, Debug)]
pub struct OverviewMetrics {
    _private: (),
}

impl Default for OverviewMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OverviewMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(OverviewMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &OverviewMetricsInner {
        GLOBAL_METRICS.get_or_init(OverviewMetricsInner::new)
    }

    pub fn observe_query_latency(&self, duration_secs: f64) {
        self.inner().query_latency_seconds.observe(duration_secs);
    }

    pub fn inc_query_errors(&self, stage: &str) {
        self.inner().query_errors.with_label_values(&[stage]).inc();
    }

    /// Update gauges and anomaly counters from a successful query
    pub fn record_overview(&self, nodes: &[AggregatedNode], stats: &JoinStats) {
        let inner = self.inner();
        inner.nodes_reported.set(nodes.len() as i64);
        inner.workloads_reported.set(stats.workloads as i64);
        inner.workloads_dropped.inc_by(stats.dropped as u64);
        inner
            .workloads_without_usage
            .inc_by(stats.without_usage as u64);
        inner.duplicate_nodes.inc_by(stats.duplicate_nodes as u64);
    }
}

/// Structured logger for refresh events
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    /// `cluster` names what is being observed, usually the stage or kubeconfig
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn log_refresh(&self, nodes: usize, workloads: usize, elapsed: Duration) {
        info!(
            event = "overview_refreshed",
            cluster = %self.cluster,
            nodes = nodes,
            workloads = workloads,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cluster overview refreshed"
        );
    }

    pub fn log_refresh_failure(&self, error: &str) {
        warn!(
            event = "overview_refresh_failed",
            cluster = %self.cluster,
            error = %error,
            "Cluster overview refresh failed, keeping previous overview"
        );
    }

    pub fn log_startup(&self, version: &str, tool: &str) {
        info!(
            event = "agent_started",
            cluster = %self.cluster,
            version = %version,
            tool = %tool,
            "kubtop agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            cluster = %self.cluster,
            reason = %reason,
            "kubtop agent shutting down"
        );
    }
}

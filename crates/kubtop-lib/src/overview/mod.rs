//! Cluster overview assembly
//!
//! [`Aggregator::overview`] is the single query the front-ends call: it
//! fetches the node report, the pod usage report and the pod list one after
//! another, then joins them into a node -> workload tree.

mod cache;
mod join;
mod refresh;

pub use cache::{OverviewCache, OverviewSnapshot};
pub use join::{join, join_with, JoinStats, LinearScan, LookupStrategy, MetricsLookup, NameIndex};
pub use refresh::{refresh_once, RefreshConfig, RefreshError, RefreshLoop, SharedAggregator};

use crate::collector::{CommandRunner, EmptyReportPolicy, ReportCollector, Scope};
use crate::error::Result;
use crate::models::{AggregatedNode, NodeMetrics, WorkloadDetail, WorkloadMetrics};
use crate::observability::OverviewMetrics;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Default report tool
pub const DEFAULT_TOOL: &str = "kubectl";

/// Parameters of one overview query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Kubeconfig file passed as `--kubeconfig`
    pub kubeconfig: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub empty_reports: EmptyReportPolicy,
}

impl QueryConfig {
    pub fn new(kubeconfig: impl Into<String>) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
            scope: Scope::default(),
            empty_reports: EmptyReportPolicy::default(),
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn empty_reports(mut self, policy: EmptyReportPolicy) -> Self {
        self.empty_reports = policy;
        self
    }
}

/// Runs overview queries. Not reentrant: share it behind a mutex.
pub struct Aggregator<R> {
    collector: ReportCollector<R>,
    lookup: LookupStrategy,
    metrics: Option<OverviewMetrics>,
}

impl<R: CommandRunner> Aggregator<R> {
    /// Create an aggregator running `tool` through `runner`
    pub fn new(runner: R, tool: impl Into<String>) -> Self {
        Self {
            collector: ReportCollector::new(runner, tool),
            lookup: LookupStrategy::default(),
            metrics: None,
        }
    }

    /// Choose how pods are matched to usage rows
    pub fn with_lookup(mut self, lookup: LookupStrategy) -> Self {
        self.lookup = lookup;
        self
    }

    /// Record query latency and join counts
    pub fn with_metrics(mut self, metrics: OverviewMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn tool(&self) -> &str {
        self.collector.program()
    }

    /// Build the node tree for the current instant.
    ///
    /// Any fetch or parse failure aborts the query; no partial tree is returned.
    pub fn overview(&mut self, config: &QueryConfig) -> Result<Vec<AggregatedNode>> {
        let start = Instant::now();
        let result = self.query(config);

        if let Some(metrics) = &self.metrics {
            metrics.observe_query_latency(start.elapsed().as_secs_f64());
            match &result {
                Ok((tree, stats)) => metrics.record_overview(tree, stats),
                Err(e) => metrics.inc_query_errors(e.stage().as_str()),
            }
        }

        match result {
            Ok((tree, stats)) => {
                debug!(
                    nodes = tree.len(),
                    workloads = stats.workloads,
                    dropped = stats.dropped,
                    without_usage = stats.without_usage,
                    duplicate_nodes = stats.duplicate_nodes,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Overview assembled"
                );
                Ok(tree)
            }
            Err(e) => {
                warn!(stage = %e.stage(), error = %e, "Overview query failed");
                Err(e)
            }
        }
    }

    fn query(&mut self, config: &QueryConfig) -> Result<(Vec<AggregatedNode>, JoinStats)> {
        let kubeconfig = config.kubeconfig.as_str();

        let nodes = self.collector.top_nodes(kubeconfig, config.empty_reports)?;
        let usage = self
            .collector
            .top_pods(kubeconfig, config.scope, config.empty_reports)?;
        let details = self.collector.pod_details(kubeconfig, config.scope)?;

        Ok(join_with(self.lookup, nodes, &usage, &details))
    }

    /// Run only the node report
    pub fn nodes(&mut self, config: &QueryConfig) -> Result<Vec<NodeMetrics>> {
        self.collector.top_nodes(&config.kubeconfig, config.empty_reports)
    }

    /// Run only the pod usage report
    pub fn pod_usage(&mut self, config: &QueryConfig) -> Result<Vec<WorkloadMetrics>> {
        self.collector
            .top_pods(&config.kubeconfig, config.scope, config.empty_reports)
    }

    /// Run only the pod list
    pub fn pod_details(&mut self, config: &QueryConfig) -> Result<Vec<WorkloadDetail>> {
        self.collector.pod_details(&config.kubeconfig, config.scope)
    }
}

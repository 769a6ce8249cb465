//! Last-known-good overview shared between the refresher and readers

use crate::models::AggregatedNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// What readers see: the last successful overview plus the latest failure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverviewSnapshot {
    pub nodes: Vec<AggregatedNode>,
    /// When `nodes` was assembled; `None` until the first success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Error of the most recent refresh, cleared by the next success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl OverviewSnapshot {
    pub fn has_data(&self) -> bool {
        self.refreshed_at.is_some()
    }

    pub fn workload_count(&self) -> usize {
        self.nodes.iter().map(|n| n.workloads.len()).sum()
    }
}

/// Cheap to clone; all clones share one snapshot
#[derive(Debug, Clone, Default)]
pub struct OverviewCache {
    inner: Arc<RwLock<OverviewSnapshot>>,
}

impl OverviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the overview after a successful refresh
    pub async fn store(&self, nodes: Vec<AggregatedNode>) {
        let mut snapshot = self.inner.write().await;
        snapshot.nodes = nodes;
        snapshot.refreshed_at = Some(Utc::now());
        snapshot.last_error = None;
        snapshot.consecutive_failures = 0;
    }

    /// Note a failed refresh. The previous overview is kept.
    pub async fn record_failure(&self, error: impl Into<String>) {
        let mut snapshot = self.inner.write().await;
        snapshot.last_error = Some(error.into());
        snapshot.consecutive_failures = snapshot.consecutive_failures.saturating_add(1);
    }

    pub async fn snapshot(&self) -> OverviewSnapshot {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> AggregatedNode {
        AggregatedNode {
            name: name.to_string(),
            cpu_millicores: 100,
            cpu_percent: 5,
            memory_mib: 512,
            memory_percent: 10,
            workloads: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_cache_initially_empty() {
        let cache = OverviewCache::new();
        let snapshot = cache.snapshot().await;
        assert!(!snapshot.has_data());
        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failure_keeps_last_good_overview() {
        let cache = OverviewCache::new();
        cache.store(vec![node("node-1")]).await;
        cache.record_failure("node_metrics: kubectl exited").await;
        cache.record_failure("node_metrics: kubectl exited").await;

        let snapshot = cache.snapshot().await;
        assert!(snapshot.has_data());
        assert_eq!(snapshot.nodes[0].name, "node-1");
        assert_eq!(snapshot.consecutive_failures, 2);
        assert!(snapshot.last_error.is_some());
    }

    #[tokio::test]
    async fn test_success_clears_error() {
        let cache = OverviewCache::new();
        cache.record_failure("boom").await;
        cache.store(vec![node("node-2")]).await;

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.nodes[0].name, "node-2");
    }
}

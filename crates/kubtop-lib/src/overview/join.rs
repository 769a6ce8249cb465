//! Joining the three reports into a node -> workload tree

use crate::models::{
    AggregatedNode, AggregatedWorkload, NodeMetrics, WorkloadDetail, WorkloadMetrics,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Finds the usage row for a pod
pub trait MetricsLookup<'a> {
    fn build(metrics: &'a [WorkloadMetrics]) -> Self;
    fn find(&self, namespace: &str, name: &str) -> Option<&'a WorkloadMetrics>;
}

/// Scans the usage rows in report order. Fine for tens to low hundreds of pods.
pub struct LinearScan<'a> {
    metrics: &'a [WorkloadMetrics],
}

impl<'a> MetricsLookup<'a> for LinearScan<'a> {
    fn build(metrics: &'a [WorkloadMetrics]) -> Self {
        Self { metrics }
    }

    fn find(&self, namespace: &str, name: &str) -> Option<&'a WorkloadMetrics> {
        self.metrics.iter().find(|m| m.matches(namespace, name))
    }
}

/// Indexes usage rows by pod name; first row wins per (namespace, name)
pub struct NameIndex<'a> {
    by_name: HashMap<&'a str, Vec<&'a WorkloadMetrics>>,
}

impl<'a> MetricsLookup<'a> for NameIndex<'a> {
    fn build(metrics: &'a [WorkloadMetrics]) -> Self {
        let mut by_name: HashMap<&'a str, Vec<&'a WorkloadMetrics>> = HashMap::new();
        for m in metrics {
            by_name.entry(m.name.as_str()).or_default().push(m);
        }
        Self { by_name }
    }

    fn find(&self, namespace: &str, name: &str) -> Option<&'a WorkloadMetrics> {
        self.by_name
            .get(name)?
            .iter()
            .copied()
            .find(|m| m.matches(namespace, name))
    }
}

/// Which lookup the join uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupStrategy {
    #[default]
    Linear,
    Indexed,
}

/// Counts of tolerated inconsistencies between the reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub workloads: usize,
    /// Pods whose node is missing from the node report
    pub dropped: usize,
    /// Pods with no usage row, reported with zero usage
    pub without_usage: usize,
    /// Repeated node rows; only the first row per name is kept
    pub duplicate_nodes: usize,
}

/// Build the node tree.
///
/// Node order follows `nodes`; workload order within a node follows `details`.
/// Node names are unique in the result: a repeated row keeps its first
/// occurrence. Never fails: missing usage is zero-filled and pods on unknown
/// nodes are dropped.
pub fn join<'a, L: MetricsLookup<'a>>(
    nodes: Vec<NodeMetrics>,
    metrics: &'a [WorkloadMetrics],
    details: &[WorkloadDetail],
) -> (Vec<AggregatedNode>, JoinStats) {
    let lookup = L::build(metrics);
    let mut stats = JoinStats::default();

    let mut seen = HashSet::new();
    let mut tree: Vec<AggregatedNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !seen.insert(node.name.clone()) {
            stats.duplicate_nodes += 1;
            debug!(node = %node.name, "Repeated node row, keeping the first");
            continue;
        }
        tree.push(AggregatedNode::from(node));
    }

    for detail in details {
        let Some(node) = tree.iter_mut().find(|n| n.name == detail.node_name) else {
            stats.dropped += 1;
            debug!(
                namespace = %detail.namespace,
                pod = %detail.name,
                node = %detail.node_name,
                "Pod scheduled on unknown node, dropping"
            );
            continue;
        };

        let usage = lookup.find(&detail.namespace, &detail.name);
        if usage.is_none() {
            stats.without_usage += 1;
            debug!(
                namespace = %detail.namespace,
                pod = %detail.name,
                "No usage metrics for pod, reporting zero"
            );
        }

        node.workloads
            .push(AggregatedWorkload::from_detail(detail, usage));
        stats.workloads += 1;
    }

    (tree, stats)
}

/// [`join`] with the lookup chosen at runtime
pub fn join_with(
    strategy: LookupStrategy,
    nodes: Vec<NodeMetrics>,
    metrics: &[WorkloadMetrics],
    details: &[WorkloadDetail],
) -> (Vec<AggregatedNode>, JoinStats) {
    match strategy {
        LookupStrategy::Linear => join::<LinearScan<'_>>(nodes, metrics, details),
        LookupStrategy::Indexed => join::<NameIndex<'_>>(nodes, metrics, details),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContainerSpec, PodPhase};

    fn node(name: &str) -> NodeMetrics {
        NodeMetrics {
            name: name.to_string(),
            cpu_millicores: 500,
            cpu_percent: 10,
            memory_mib: 1024,
            memory_percent: 20,
        }
    }

    fn usage(namespace: &str, name: &str, cpu: u64, mem: u64) -> WorkloadMetrics {
        WorkloadMetrics {
            namespace: namespace.to_string(),
            name: name.to_string(),
            cpu_millicores: cpu,
            memory_mib: mem,
        }
    }

    fn detail(namespace: &str, name: &str, node: &str) -> WorkloadDetail {
        WorkloadDetail {
            name: name.to_string(),
            namespace: namespace.to_string(),
            node_name: node.to_string(),
            containers: vec![ContainerSpec {
                name: "main".to_string(),
                image: "nginx:1.21".to_string(),
                memory_limit: Some("512Mi".to_string()),
            }],
            image: "nginx:1.21".to_string(),
            memory_limit_mib: 512,
            phase: PodPhase::Running,
            phase_start: None,
            ip: String::new(),
        }
    }

    #[test]
    fn test_join_places_workloads_in_detail_order() {
        let nodes = vec![node("node-1"), node("node-2")];
        let metrics = vec![
            usage("default", "a", 1, 10),
            usage("default", "b", 2, 20),
            usage("default", "c", 3, 30),
        ];
        let details = vec![
            detail("default", "c", "node-1"),
            detail("default", "a", "node-2"),
            detail("default", "b", "node-1"),
        ];

        let (tree, stats) = join::<LinearScan<'_>>(nodes, &metrics, &details);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "node-1");
        let names: Vec<&str> = tree[0].workloads.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, ["c", "b"]);
        assert_eq!(tree[0].workloads[0].cpu_millicores, 3);
        assert_eq!(tree[1].workloads[0].name, "a");
        assert_eq!(tree[1].workloads[0].memory_mib, 10);
        assert_eq!(
            stats,
            JoinStats {
                workloads: 3,
                dropped: 0,
                without_usage: 0,
                duplicate_nodes: 0,
            }
        );
    }

    #[test]
    fn test_join_independent_of_metrics_order() {
        let details = vec![
            detail("default", "a", "node-1"),
            detail("kube-system", "a", "node-1"),
            detail("default", "b", "node-2"),
        ];
        let metrics = vec![
            usage("default", "a", 1, 10),
            usage("kube-system", "a", 5, 50),
            usage("default", "b", 2, 20),
        ];
        let mut reversed = metrics.clone();
        reversed.reverse();
        let rotated = vec![metrics[1].clone(), metrics[2].clone(), metrics[0].clone()];

        let nodes = || vec![node("node-1"), node("node-2")];
        let (expected, _) = join::<LinearScan<'_>>(nodes(), &metrics, &details);

        for permuted in [&reversed, &rotated] {
            let (linear, _) = join::<LinearScan<'_>>(nodes(), permuted, &details);
            let (indexed, _) = join::<NameIndex<'_>>(nodes(), permuted, &details);
            assert_eq!(linear, expected);
            assert_eq!(indexed, expected);
        }

        assert_eq!(expected[0].workloads[1].namespace, "kube-system");
        assert_eq!(expected[0].workloads[1].cpu_millicores, 5);
    }

    #[test]
    fn test_join_drops_workload_on_unknown_node() {
        let metrics = vec![usage("default", "a", 1, 10), usage("default", "b", 2, 20)];
        let details = vec![
            detail("default", "a", "node-1"),
            detail("default", "b", "node-gone"),
        ];

        let (tree, stats) = join::<LinearScan<'_>>(vec![node("node-1")], &metrics, &details);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].workloads.len(), 1);
        assert!(tree
            .iter()
            .flat_map(|n| &n.workloads)
            .all(|w| w.name != "b"));
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_dropped_workload_not_counted_as_without_usage() {
        let details = vec![detail("default", "orphan", "node-gone")];

        let (_, stats) = join_with(LookupStrategy::Linear, vec![node("node-1")], &[], &details);

        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.without_usage, 0);
        assert_eq!(stats.workloads, 0);
    }

    #[test]
    fn test_repeated_node_rows_collapse_to_first() {
        let mut repeated = node("node-1");
        repeated.cpu_millicores = 999;
        let nodes = vec![node("node-1"), node("node-2"), repeated];
        let metrics = vec![usage("default", "a", 1, 10)];
        let details = vec![detail("default", "a", "node-1")];

        for strategy in [LookupStrategy::Linear, LookupStrategy::Indexed] {
            let (tree, stats) = join_with(strategy, nodes.clone(), &metrics, &details);

            let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
            assert_eq!(names, ["node-1", "node-2"]);
            assert_eq!(tree[0].cpu_millicores, 500);
            assert_eq!(tree[0].workloads.len(), 1);
            assert_eq!(stats.duplicate_nodes, 1);
        }
    }

    #[test]
    fn test_join_zero_fills_missing_usage() {
        let details = vec![detail("default", "fresh", "node-1")];

        let (tree, stats) = join_with(LookupStrategy::Indexed, vec![node("node-1")], &[], &details);

        let workload = &tree[0].workloads[0];
        assert_eq!(workload.cpu_millicores, 0);
        assert_eq!(workload.memory_mib, 0);
        assert_eq!(workload.memory_limit_mib, 512);
        assert_eq!(stats.without_usage, 1);
    }

    #[test]
    fn test_scoped_usage_matches_by_name() {
        let metrics = vec![usage("", "a", 7, 70)];
        let details = vec![detail("team-a", "a", "node-1")];

        let (tree, _) = join_with(LookupStrategy::Linear, vec![node("node-1")], &metrics, &details);

        assert_eq!(tree[0].workloads[0].cpu_millicores, 7);
    }

    #[test]
    fn test_nodes_without_workloads_kept() {
        let (tree, stats) = join_with(
            LookupStrategy::Linear,
            vec![node("node-1"), node("node-2")],
            &[],
            &[],
        );
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().all(|n| n.workloads.is_empty()));
        assert_eq!(stats, JoinStats::default());
    }
}

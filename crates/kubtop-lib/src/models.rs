//! Core data models for the cluster overview

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory limit value used when a container declares no limit, or one
/// that is not expressed in `Mi`/`Gi`.
pub const NO_MEMORY_LIMIT: i64 = -1;

/// One row of `kubectl top node`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub name: String,
    pub cpu_millicores: u64,
    pub cpu_percent: u64,
    pub memory_mib: u64,
    pub memory_percent: u64,
}

/// One row of `kubectl top pods`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadMetrics {
    /// Empty when the report was taken for a single namespace
    pub namespace: String,
    pub name: String,
    pub cpu_millicores: u64,
    pub memory_mib: u64,
}

impl WorkloadMetrics {
    /// Whether this usage row belongs to the given pod.
    ///
    /// Rows from a scoped report carry no namespace and match by name alone.
    pub fn matches(&self, namespace: &str, name: &str) -> bool {
        self.name == name && (self.namespace.is_empty() || self.namespace == namespace)
    }
}

/// Lifecycle phase reported in `status.phase`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PodPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A container declared in a pod spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Raw `resources.limits.memory` value, if declared
    pub memory_limit: Option<String>,
}

/// Pod description taken from `kubectl get pods -o json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadDetail {
    pub name: String,
    pub namespace: String,
    /// Node the pod is scheduled on. May name a node missing from the node
    /// report when both reports were taken at different instants.
    pub node_name: String,
    /// Every declared container; only the first one feeds `image` and
    /// `memory_limit_mib`.
    pub containers: Vec<ContainerSpec>,
    pub image: String,
    /// Memory limit of the first container, or [`NO_MEMORY_LIMIT`]
    pub memory_limit_mib: i64,
    pub phase: PodPhase,
    pub phase_start: Option<DateTime<Utc>>,
    /// Empty when no address has been assigned yet
    pub ip: String,
}

/// A pod placed under its node, with live usage merged in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedWorkload {
    pub name: String,
    pub namespace: String,
    /// Zero when the usage report has no row for this pod
    pub cpu_millicores: u64,
    /// Zero when the usage report has no row for this pod
    pub memory_mib: u64,
    pub memory_limit_mib: i64,
    pub image: String,
    pub phase: PodPhase,
    pub phase_start: Option<DateTime<Utc>>,
    pub ip: String,
}

impl AggregatedWorkload {
    /// Combine a pod description with its usage row, zero-filling usage when absent
    pub fn from_detail(detail: &WorkloadDetail, usage: Option<&WorkloadMetrics>) -> Self {
        Self {
            name: detail.name.clone(),
            namespace: detail.namespace.clone(),
            cpu_millicores: usage.map(|u| u.cpu_millicores).unwrap_or(0),
            memory_mib: usage.map(|u| u.memory_mib).unwrap_or(0),
            memory_limit_mib: detail.memory_limit_mib,
            image: detail.image.clone(),
            phase: detail.phase,
            phase_start: detail.phase_start,
            ip: detail.ip.clone(),
        }
    }

    /// Whether a memory limit was declared and understood
    pub fn has_memory_limit(&self) -> bool {
        self.memory_limit_mib != NO_MEMORY_LIMIT
    }
}

/// A node with the pods scheduled on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedNode {
    pub name: String,
    pub cpu_millicores: u64,
    pub cpu_percent: u64,
    pub memory_mib: u64,
    pub memory_percent: u64,
    pub workloads: Vec<AggregatedWorkload>,
}

impl From<NodeMetrics> for AggregatedNode {
    fn from(node: NodeMetrics) -> Self {
        Self {
            name: node.name,
            cpu_millicores: node.cpu_millicores,
            cpu_percent: node.cpu_percent,
            memory_mib: node.memory_mib,
            memory_percent: node.memory_percent,
            workloads: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_phase_unknown_fallback() {
        let phase: PodPhase = serde_json::from_str("\"Evicted\"").unwrap();
        assert_eq!(phase, PodPhase::Unknown);

        let phase: PodPhase = serde_json::from_str("\"Running\"").unwrap();
        assert_eq!(phase, PodPhase::Running);
        assert_eq!(phase.to_string(), "Running");
    }

    #[test]
    fn test_scoped_metrics_match_by_name_only() {
        let scoped = WorkloadMetrics {
            namespace: String::new(),
            name: "pod-a".to_string(),
            cpu_millicores: 1,
            memory_mib: 1,
        };
        assert!(scoped.matches("default", "pod-a"));
        assert!(scoped.matches("kube-system", "pod-a"));
        assert!(!scoped.matches("default", "pod-b"));

        let namespaced = WorkloadMetrics {
            namespace: "default".to_string(),
            ..scoped
        };
        assert!(namespaced.matches("default", "pod-a"));
        assert!(!namespaced.matches("kube-system", "pod-a"));
    }
}

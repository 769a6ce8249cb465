//! `kubectl get pods -o json` decoding

use crate::error::ParseError;
use crate::models::{ContainerSpec, PodPhase, WorkloadDetail, NO_MEMORY_LIMIT};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

const MIB_PER_GIB: i64 = 1024;

// Only the fields the overview needs; everything else in the pod object is ignored.

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: Metadata,
    spec: PodSpec,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(default)]
    containers: Vec<Container>,
    #[serde(default)]
    node_name: String,
}

#[derive(Debug, Deserialize)]
struct Container {
    #[serde(default)]
    name: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    resources: Resources,
}

#[derive(Debug, Default, Deserialize)]
struct Resources {
    #[serde(default)]
    limits: Limits,
}

#[derive(Debug, Default, Deserialize)]
struct Limits {
    memory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodStatus {
    #[serde(default)]
    phase: PodPhase,
    #[serde(rename = "podIP", default)]
    pod_ip: String,
    start_time: Option<DateTime<Utc>>,
}

/// Decode a pod list into one [`WorkloadDetail`] per item, in list order.
///
/// Image and memory limit are taken from the first container only; the full
/// container list is kept on the record. A pod with no containers is rejected.
pub fn parse_pod_details(json: &[u8]) -> Result<Vec<WorkloadDetail>, ParseError> {
    let list: PodList = serde_json::from_slice(json)?;

    list.items.into_iter().map(into_detail).collect()
}

fn into_detail(pod: Pod) -> Result<WorkloadDetail, ParseError> {
    let containers: Vec<ContainerSpec> = pod
        .spec
        .containers
        .into_iter()
        .map(|c| ContainerSpec {
            name: c.name,
            image: c.image,
            memory_limit: c.resources.limits.memory,
        })
        .collect();

    let first = containers.first().ok_or_else(|| ParseError::NoContainers {
        namespace: pod.metadata.namespace.clone(),
        name: pod.metadata.name.clone(),
    })?;

    let image = first.image.clone();
    let memory_limit_mib = first
        .memory_limit
        .as_deref()
        .map(parse_memory_limit_mib)
        .unwrap_or(NO_MEMORY_LIMIT);

    Ok(WorkloadDetail {
        name: pod.metadata.name,
        namespace: pod.metadata.namespace,
        node_name: pod.spec.node_name,
        containers,
        image,
        memory_limit_mib,
        phase: pod.status.phase,
        phase_start: pod.status.start_time,
        ip: pod.status.pod_ip,
    })
}

/// Convert a memory quantity to MiB. Only `Mi` and `Gi` suffixes are
/// understood; anything else yields [`NO_MEMORY_LIMIT`].
pub fn parse_memory_limit_mib(quantity: &str) -> i64 {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*([0-9]+)(Mi|Gi)\s*$").expect("memory quantity pattern is valid")
    });

    let Some(caps) = re.captures(quantity) else {
        return NO_MEMORY_LIMIT;
    };
    let Ok(value) = caps[1].parse::<i64>() else {
        return NO_MEMORY_LIMIT;
    };

    match &caps[2] {
        "Gi" => value.checked_mul(MIB_PER_GIB).unwrap_or(NO_MEMORY_LIMIT),
        _ => value,
    }
}

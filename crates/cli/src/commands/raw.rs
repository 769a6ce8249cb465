//! Single-report commands, for checking what one `kubectl` report parses to

use anyhow::{Context, Result};
use clap::ValueEnum;
use kubtop_lib::{NodeMetrics, WorkloadDetail, WorkloadMetrics, NO_MEMORY_LIMIT};
use serde::Serialize;
use tabled::Tabled;

use super::QueryContext;
use crate::output::{format_cpu, format_mib, print_table, OutputFormat};

/// Which report to run
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RawReport {
    /// `kubectl top node`
    Nodes,
    /// `kubectl top pods`
    Pods,
    /// `kubectl get pods -o json`
    Details,
}

#[derive(Tabled, Serialize)]
struct NodeRow {
    #[tabled(rename = "Node")]
    name: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPU%")]
    cpu_percent: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Memory%")]
    memory_percent: String,
}

impl From<&NodeMetrics> for NodeRow {
    fn from(n: &NodeMetrics) -> Self {
        Self {
            name: n.name.clone(),
            cpu: format_cpu(n.cpu_millicores),
            cpu_percent: format!("{}%", n.cpu_percent),
            memory: format_mib(n.memory_mib),
            memory_percent: format!("{}%", n.memory_percent),
        }
    }
}

#[derive(Tabled, Serialize)]
struct UsageRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    name: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

impl From<&WorkloadMetrics> for UsageRow {
    fn from(p: &WorkloadMetrics) -> Self {
        Self {
            namespace: if p.namespace.is_empty() {
                "-".to_string()
            } else {
                p.namespace.clone()
            },
            name: p.name.clone(),
            cpu: format_cpu(p.cpu_millicores),
            memory: format_mib(p.memory_mib),
        }
    }
}

#[derive(Tabled, Serialize)]
struct DetailRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    name: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Containers")]
    containers: usize,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Phase")]
    phase: String,
}

impl From<&WorkloadDetail> for DetailRow {
    fn from(d: &WorkloadDetail) -> Self {
        Self {
            namespace: d.namespace.clone(),
            name: d.name.clone(),
            node: d.node_name.clone(),
            containers: d.containers.len(),
            image: d.image.clone(),
            limit: if d.memory_limit_mib == NO_MEMORY_LIMIT {
                "-".to_string()
            } else {
                format_mib(d.memory_limit_mib as u64)
            },
            phase: d.phase.to_string(),
        }
    }
}

/// Run one report and print its parsed records
pub async fn show_report(ctx: &QueryContext, report: RawReport, format: OutputFormat) -> Result<()> {
    let aggregator = ctx.aggregator();
    let query = ctx.query.clone();

    // Same locking and blocking-pool discipline as a full overview query
    let mut guard = aggregator.lock_owned().await;
    let printed = tokio::task::spawn_blocking(move || -> Result<()> {
        match report {
            RawReport::Nodes => {
                let nodes = guard.nodes(&query)?;
                match format {
                    OutputFormat::Json => crate::output::print_json(&nodes),
                    OutputFormat::Table => {
                        let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();
                        print_table(&rows, format)
                    }
                }
            }
            RawReport::Pods => {
                let pods = guard.pod_usage(&query)?;
                match format {
                    OutputFormat::Json => crate::output::print_json(&pods),
                    OutputFormat::Table => {
                        let rows: Vec<UsageRow> = pods.iter().map(UsageRow::from).collect();
                        print_table(&rows, format)
                    }
                }
            }
            RawReport::Details => {
                let details = guard.pod_details(&query)?;
                match format {
                    OutputFormat::Json => crate::output::print_json(&details),
                    OutputFormat::Table => {
                        let rows: Vec<DetailRow> = details.iter().map(DetailRow::from).collect();
                        print_table(&rows, format)
                    }
                }
            }
        }
    })
    .await
    .context("Report task panicked")?;

    printed.with_context(|| format!("Failed to fetch {:?} report for {}", report, ctx.target.name))
}

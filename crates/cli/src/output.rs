//! Output formatting utilities

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use kubtop_lib::{AggregatedNode, AggregatedWorkload, PodPhase};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for the per-node workload table
#[derive(Tabled)]
struct WorkloadRow {
    #[tabled(rename = "Pod")]
    name: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "IP")]
    ip: String,
}

impl WorkloadRow {
    fn new(w: &AggregatedWorkload, now: DateTime<Utc>) -> Self {
        Self {
            name: w.name.clone(),
            namespace: w.namespace.clone(),
            cpu: format_cpu(w.cpu_millicores),
            memory: format_mib(w.memory_mib),
            limit: if w.has_memory_limit() {
                format!(
                    "{} ({})",
                    format_mib(w.memory_limit_mib as u64),
                    color_percent(percent_of(w.memory_mib, w.memory_limit_mib as u64))
                )
            } else {
                "-".dimmed().to_string()
            },
            image: w.image.clone(),
            phase: color_phase(w.phase),
            age: w
                .phase_start
                .map(|start| format_age(now - start))
                .unwrap_or_else(|| "-".to_string()),
            ip: if w.ip.is_empty() {
                "-".to_string()
            } else {
                w.ip.clone()
            },
        }
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return Ok(());
            }
            println!("{}", Table::new(items).with(Style::rounded()));
            Ok(())
        }
        OutputFormat::Json => print_json(items),
    }
}

/// Print the node tree: one header per node, then its pods
pub fn print_overview(nodes: &[AggregatedNode], format: OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        return print_json(nodes);
    }

    if nodes.is_empty() {
        print_warning("No nodes reported");
        return Ok(());
    }

    let now = Utc::now();
    for node in nodes {
        println!(
            "{}  CPU {} ({})  Memory {} ({})  Pods {}",
            node.name.bold().cyan(),
            format_cpu(node.cpu_millicores),
            color_percent(node.cpu_percent),
            format_mib(node.memory_mib),
            color_percent(node.memory_percent),
            node.workloads.len()
        );

        if node.workloads.is_empty() {
            println!("  {}\n", "no pods".dimmed());
            continue;
        }

        let rows: Vec<WorkloadRow> = node
            .workloads
            .iter()
            .map(|w| WorkloadRow::new(w, now))
            .collect();
        println!("{}\n", Table::new(rows).with(Style::rounded()));
    }

    let pods: usize = nodes.iter().map(|n| n.workloads.len()).sum();
    println!("Total: {} nodes, {} pods", nodes.len(), pods);
    Ok(())
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format MiB as human-readable string
pub fn format_mib(mib: u64) -> String {
    if mib >= 1024 {
        format!("{:.1}Gi", mib as f64 / 1024.0)
    } else {
        format!("{}Mi", mib)
    }
}

/// Format millicores as human-readable string
pub fn format_cpu(millicores: u64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

/// Format a duration like kubectl's AGE column
pub fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h{}m", s / 3600, (s % 3600) / 60),
        s => format!("{}d{}h", s / 86_400, (s % 86_400) / 3600),
    }
}

fn percent_of(used: u64, limit: u64) -> u64 {
    if limit == 0 {
        0
    } else {
        used * 100 / limit
    }
}

/// Color a usage percentage: green below 70, yellow below 90, red above
pub fn color_percent(percent: u64) -> String {
    let formatted = format!("{}%", percent);
    if percent >= 90 {
        formatted.red().to_string()
    } else if percent >= 70 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Color a pod phase
pub fn color_phase(phase: PodPhase) -> String {
    let text = phase.as_str();
    match phase {
        PodPhase::Running => text.green().to_string(),
        PodPhase::Succeeded => text.blue().to_string(),
        PodPhase::Pending => text.yellow().to_string(),
        PodPhase::Failed => text.red().to_string(),
        PodPhase::Unknown => text.dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mib() {
        assert_eq!(format_mib(256), "256Mi");
        assert_eq!(format_mib(1024), "1.0Gi");
        assert_eq!(format_mib(1536), "1.5Gi");
    }

    #[test]
    fn test_format_cpu() {
        assert_eq!(format_cpu(100), "100m");
        assert_eq!(format_cpu(1500), "1.5");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_age(chrono::Duration::seconds(125)), "2m");
        assert_eq!(format_age(chrono::Duration::seconds(3 * 3600 + 600)), "3h10m");
        assert_eq!(format_age(chrono::Duration::seconds(2 * 86_400 + 7200)), "2d2h");
        assert_eq!(format_age(chrono::Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(256, 512), 50);
        assert_eq!(percent_of(10, 0), 0);
    }
}

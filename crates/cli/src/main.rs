//! kubtop CLI
//!
//! Shows per-node CPU and memory usage together with the pods scheduled on
//! each node, assembled from `kubectl top` and `kubectl get pods`.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::raw::RawReport;
use commands::{overview, raw, stages, QueryContext};
use kubtop_lib::overview::LookupStrategy;
use kubtop_lib::{EmptyReportPolicy, QueryConfig, Scope, DEFAULT_TOOL};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Kubernetes node and pod resource overview
#[derive(Parser)]
#[command(name = "kubtop")]
#[command(author, version, about = "Node and pod resource overview for Kubernetes clusters", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (overrides any stage)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<String>,

    /// Stage from the stages file, by name or index
    #[arg(long, short, env = "KUBTOP_STAGE", global = true)]
    pub stage: Option<String>,

    /// Stages file (default: ~/.config/kubtop/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Report tool to run
    #[arg(long, env = "KUBTOP_TOOL", default_value = DEFAULT_TOOL, global = true)]
    pub tool: String,

    /// Only query the kubeconfig's current namespace instead of all namespaces
    #[arg(long, global = true)]
    pub current_namespace: bool,

    /// Accept `kubectl top` reports without any data lines
    #[arg(long, global = true)]
    pub allow_empty: bool,

    /// Match pods to usage rows through a name index instead of a linear scan
    #[arg(long, global = true)]
    pub indexed_lookup: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the node overview once (default)
    Overview,

    /// Refresh the node overview until interrupted
    Watch {
        /// Seconds between refreshes (default: stages file, then 5)
        #[arg(long, short)]
        interval: Option<u64>,
    },

    /// Run a single report and print what it parses to
    Raw {
        #[arg(value_enum)]
        report: RawReport,
    },

    /// List configured stages
    Stages,
}

impl Cli {
    fn query_context(&self, config: &config::Config) -> Result<QueryContext> {
        let target = config::resolve_target(
            config,
            self.kubeconfig.as_deref(),
            self.stage.as_deref(),
        )?;

        let empty_reports = if self.allow_empty {
            EmptyReportPolicy::Allow
        } else {
            EmptyReportPolicy::Reject
        };
        let query = QueryConfig::new(target.kubeconfig.clone())
            .scope(Scope::from_all_namespaces(!self.current_namespace))
            .empty_reports(empty_reports);

        let lookup = if self.indexed_lookup {
            LookupStrategy::Indexed
        } else {
            LookupStrategy::Linear
        };

        Ok(QueryContext {
            target,
            query,
            tool: self.tool.clone(),
            lookup,
        })
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so table and JSON output stay clean
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load(cli.config.as_deref())?;

    match &cli.command {
        Some(Commands::Stages) => stages::list_stages(&config, cli.format),
        Some(Commands::Raw { report }) => {
            let ctx = cli.query_context(&config)?;
            raw::show_report(&ctx, *report, cli.format).await
        }
        Some(Commands::Watch { interval }) => {
            let ctx = cli.query_context(&config)?;
            let seconds = interval.unwrap_or_else(|| config.refresh_seconds()).max(1);
            overview::watch_overview(&ctx, Duration::from_secs(seconds), cli.format).await
        }
        Some(Commands::Overview) | None => {
            let ctx = cli.query_context(&config)?;
            overview::show_overview(&ctx, cli.format).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

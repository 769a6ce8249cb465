//! Overview commands: one-shot and watch mode

use anyhow::{Context, Result};
use colored::Colorize;
use kubtop_lib::overview::{refresh_once, RefreshConfig, RefreshLoop};
use kubtop_lib::{OverviewCache, OverviewSnapshot, StructuredLogger};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

use super::QueryContext;
use crate::output::{print_error, print_overview, print_warning, OutputFormat};

/// Fetch the overview once and print it
pub async fn show_overview(ctx: &QueryContext, format: OutputFormat) -> Result<()> {
    let aggregator = ctx.aggregator();
    let nodes = refresh_once(&aggregator, &ctx.query)
        .await
        .with_context(|| format!("Failed to fetch overview for {}", ctx.target.name))?;

    print_overview(&nodes, format)
}

/// Refresh every `interval` until Ctrl-C, redrawing after each refresh.
///
/// A failed refresh keeps the previous overview on screen with the error
/// shown above it.
pub async fn watch_overview(
    ctx: &QueryContext,
    interval: Duration,
    format: OutputFormat,
) -> Result<()> {
    let mut refresher = RefreshLoop::new(ctx.aggregator(), ctx.query.clone(), OverviewCache::new())
        .config(RefreshConfig { interval })
        .logger(StructuredLogger::new(ctx.target.name.clone()));
    let mut updates = refresher.subscribe(1);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let refresh_handle = tokio::spawn(refresher.run(shutdown_rx));

    let result = loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(snapshot) = update else {
                    break Ok(());
                };
                if let Err(e) = render(ctx, &snapshot, interval, format) {
                    break Err(e);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                debug!("Interrupted, stopping watch");
                break signal.context("Failed to listen for Ctrl-C");
            }
        }
    };

    // An unread snapshot would otherwise block the in-flight cycle forever
    drop(updates);
    let _ = shutdown_tx.send(());
    refresh_handle.await.context("Refresh loop panicked")?;
    result
}

fn render(
    ctx: &QueryContext,
    snapshot: &OverviewSnapshot,
    interval: Duration,
    format: OutputFormat,
) -> Result<()> {
    if let OutputFormat::Json = format {
        // One document per refresh, so the stream can be piped line by line
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }

    // Clear screen and move the cursor home
    print!("\x1B[2J\x1B[H");

    let refreshed = snapshot
        .refreshed_at
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!(
        "{}  refreshed {}  every {}s  (Ctrl-C to quit)\n",
        ctx.target.name.bold(),
        refreshed,
        interval.as_secs()
    );

    if let Some(error) = &snapshot.last_error {
        print_error(&format!(
            "Refresh failed ({} in a row): {}",
            snapshot.consecutive_failures, error
        ));
        if snapshot.has_data() {
            print_warning("Showing last successful overview");
        }
        println!();
    }

    if snapshot.has_data() {
        print_overview(&snapshot.nodes, format)?;
    }
    Ok(())
}


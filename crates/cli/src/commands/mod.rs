//! CLI subcommands

pub mod overview;
pub mod raw;
pub mod stages;

use crate::config::Target;
use kubtop_lib::overview::{LookupStrategy, SharedAggregator};
use kubtop_lib::{Aggregator, ProcessRunner, QueryConfig};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything a query subcommand needs, resolved from flags and config
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub target: Target,
    pub query: QueryConfig,
    /// Report tool to run, `kubectl` unless overridden
    pub tool: String,
    pub lookup: LookupStrategy,
}

impl QueryContext {
    /// A fresh aggregator behind the mutex every query goes through
    pub fn aggregator(&self) -> SharedAggregator<ProcessRunner> {
        let aggregator =
            Aggregator::new(ProcessRunner::new(), self.tool.clone()).with_lookup(self.lookup);
        Arc::new(Mutex::new(aggregator))
    }
}

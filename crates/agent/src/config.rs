//! Agent configuration

use anyhow::{Context, Result};
use kubtop_lib::overview::LookupStrategy;
use kubtop_lib::{EmptyReportPolicy, QueryConfig, Scope, DEFAULT_TOOL};
use serde::Deserialize;
use std::time::Duration;

/// Agent configuration, read from `KUBTOP_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Kubeconfig passed to every report
    #[serde(default = "default_kubeconfig")]
    pub kubeconfig: String,

    /// API server port for overview/health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between overview refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Query every namespace rather than the kubeconfig's current one
    #[serde(default = "default_all_namespaces")]
    pub all_namespaces: bool,

    /// Accept `kubectl top` reports without data lines
    #[serde(default)]
    pub allow_empty_reports: bool,

    /// Match pods to usage rows through a name index
    #[serde(default)]
    pub indexed_lookup: bool,

    /// Report tool to run
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Name used in logs; defaults to the kubeconfig path
    #[serde(default)]
    pub cluster_name: Option<String>,
}

fn default_kubeconfig() -> String {
    if let Ok(path) = std::env::var("KUBECONFIG") {
        if !path.is_empty() {
            return path;
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.kube/config", home)
}

fn default_api_port() -> u16 {
    8080
}

fn default_refresh_interval() -> u64 {
    5
}

fn default_all_namespaces() -> bool {
    true
}

fn default_tool() -> String {
    DEFAULT_TOOL.to_string()
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_builder(
            config::Config::builder().add_source(config::Environment::with_prefix("KUBTOP")),
        )
    }

    /// Load configuration from any set of sources
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder.build().context("Failed to read agent configuration")?;
        let mut agent: AgentConfig = config
            .try_deserialize()
            .context("Invalid agent configuration")?;
        agent.refresh_interval_secs = agent.refresh_interval_secs.max(1);
        Ok(agent)
    }

    pub fn query(&self) -> QueryConfig {
        let empty_reports = if self.allow_empty_reports {
            EmptyReportPolicy::Allow
        } else {
            EmptyReportPolicy::Reject
        };
        QueryConfig::new(self.kubeconfig.clone())
            .scope(Scope::from_all_namespaces(self.all_namespaces))
            .empty_reports(empty_reports)
    }

    pub fn lookup(&self) -> LookupStrategy {
        if self.indexed_lookup {
            LookupStrategy::Indexed
        } else {
            LookupStrategy::Linear
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn cluster_name(&self) -> &str {
        self.cluster_name.as_deref().unwrap_or(&self.kubeconfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_builder(
            config::Config::builder().set_override("kubeconfig", "/etc/kube/dev.conf").unwrap(),
        )
        .unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.tool, "kubectl");
        assert_eq!(config.lookup(), LookupStrategy::Linear);
        assert_eq!(config.cluster_name(), "/etc/kube/dev.conf");

        let query = config.query();
        assert_eq!(query.kubeconfig, "/etc/kube/dev.conf");
        assert_eq!(query.scope, Scope::AllNamespaces);
        assert_eq!(query.empty_reports, EmptyReportPolicy::Reject);
    }

    #[test]
    fn test_overrides() {
        let builder = config::Config::builder()
            .set_override("kubeconfig", "prod.conf")
            .unwrap()
            .set_override("api_port", 9100)
            .unwrap()
            .set_override("refresh_interval_secs", 0)
            .unwrap()
            .set_override("all_namespaces", false)
            .unwrap()
            .set_override("allow_empty_reports", true)
            .unwrap()
            .set_override("cluster_name", "prod")
            .unwrap();

        let config = AgentConfig::from_builder(builder).unwrap();

        assert_eq!(config.api_port, 9100);
        // Zero would spin the refresh loop
        assert_eq!(config.refresh_interval_secs, 1);
        assert_eq!(config.cluster_name(), "prod");
        assert_eq!(config.query().scope, Scope::CurrentNamespace);
        assert_eq!(config.query().empty_reports, EmptyReportPolicy::Allow);
    }

    #[test]
    fn test_invalid_port_is_error() {
        let builder = config::Config::builder()
            .set_override("api_port", "not-a-port")
            .unwrap();
        assert!(AgentConfig::from_builder(builder).is_err());
    }
}

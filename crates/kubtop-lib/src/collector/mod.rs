//! Report collection from the cluster management tool
//!
//! This module runs `kubectl` for the three reports the overview is built
//! from and turns their output into typed records:
//! - `top node` (tabular) into [`NodeMetrics`]
//! - `top pods` (tabular) into [`WorkloadMetrics`]
//! - `get pods -o json` into [`WorkloadDetail`]

mod pods;
mod runner;
mod top;


pub use pods::{parse_memory_limit_mib, parse_pod_details};
pub use runner::ProcessRunner;
pub use top::{parse_top_nodes, parse_top_pods};

use crate::error::{KubtopError, RunError, Stage};
use crate::models::{NodeMetrics, WorkloadDetail, WorkloadMetrics};
use serde::{Deserialize, Serialize};

/// Executes an external command, appending its stdout to a caller buffer
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String], stdout: &mut Vec<u8>) -> Result<(), RunError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for Box<R> {
    fn run(&self, program: &str, args: &[String], stdout: &mut Vec<u8>) -> Result<(), RunError> {
        (**self).run(program, args, stdout)
    }
}

/// Namespace scope of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The kubeconfig's current namespace; reports carry no namespace column
    CurrentNamespace,
    /// Every namespace (`-A`)
    #[default]
    AllNamespaces,
}

impl Scope {
    pub fn from_all_namespaces(all: bool) -> Self {
        if all {
            Scope::AllNamespaces
        } else {
            Scope::CurrentNamespace
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Scope::AllNamespaces)
    }
}

/// What a tabular report with no data lines means.
///
/// `kubectl top` prints nothing parseable both for an empty cluster and for
/// some misconfigurations, so this is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReportPolicy {
    /// Fail the query with "report contained no entries"
    #[default]
    Reject,
    /// Treat it as an empty list
    Allow,
}

/// The three reports an overview is assembled from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    TopNodes,
    TopPods,
    PodDetails,
}

impl Report {
    /// Command-line arguments for this report against `kubeconfig`
    pub fn args(&self, scope: Scope, kubeconfig: &str) -> Vec<String> {
        let mut args: Vec<String> = match self {
            Report::TopNodes => vec!["top".into(), "node".into()],
            Report::TopPods => vec!["top".into(), "pods".into()],
            Report::PodDetails => vec!["get".into(), "pods".into()],
        };
        if scope.is_all() && *self != Report::TopNodes {
            args.push("-A".into());
        }
        if *self == Report::PodDetails {
            args.push("-o".into());
            args.push("json".into());
        }
        args.push("--kubeconfig".into());
        args.push(kubeconfig.into());
        args
    }

    pub fn stage(&self) -> Stage {
        match self {
            Report::TopNodes => Stage::NodeMetrics,
            Report::TopPods => Stage::WorkloadMetrics,
            Report::PodDetails => Stage::WorkloadDetails,
        }
    }
}

/// Fetches and parses reports through one reusable output buffer.
///
/// Holding the buffer behind `&mut self` keeps fetches strictly sequential.
pub struct ReportCollector<R> {
    runner: R,
    program: String,
    buffer: Vec<u8>,
}

impl<R: CommandRunner> ReportCollector<R> {
    pub fn new(runner: R, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            buffer: Vec::new(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run one report into the (cleared) buffer
    fn run(&mut self, report: Report, scope: Scope, kubeconfig: &str) -> Result<(), KubtopError> {
        self.buffer.clear();
        let args = report.args(scope, kubeconfig);
        self.runner
            .run(&self.program, &args, &mut self.buffer)
            .map_err(|source| KubtopError::Run {
                stage: report.stage(),
                source,
            })
    }

    fn text(&self, stage: Stage) -> Result<&str, KubtopError> {
        std::str::from_utf8(&self.buffer).map_err(|e| KubtopError::Parse {
            stage,
            source: e.into(),
        })
    }

    /// `kubectl top node`
    pub fn top_nodes(
        &mut self,
        kubeconfig: &str,
        policy: EmptyReportPolicy,
    ) -> Result<Vec<NodeMetrics>, KubtopError> {
        let stage = Stage::NodeMetrics;
        self.run(Report::TopNodes, Scope::CurrentNamespace, kubeconfig)?;
        parse_top_nodes(self.text(stage)?, policy)
            .map_err(|source| KubtopError::Parse { stage, source })
    }

    /// `kubectl top pods [-A]`
    pub fn top_pods(
        &mut self,
        kubeconfig: &str,
        scope: Scope,
        policy: EmptyReportPolicy,
    ) -> Result<Vec<WorkloadMetrics>, KubtopError> {
        let stage = Stage::WorkloadMetrics;
        self.run(Report::TopPods, scope, kubeconfig)?;
        parse_top_pods(self.text(stage)?, scope, policy)
            .map_err(|source| KubtopError::Parse { stage, source })
    }

    /// `kubectl get pods [-A] -o json`
    pub fn pod_details(
        &mut self,
        kubeconfig: &str,
        scope: Scope,
    ) -> Result<Vec<WorkloadDetail>, KubtopError> {
        let stage = Stage::WorkloadDetails;
        self.run(Report::PodDetails, scope, kubeconfig)?;
        parse_pod_details(&self.buffer).map_err(|source| KubtopError::Parse { stage, source })
    }
}

#[cfg(test)]
mod args_tests {
    use super::*;

    #[test]
    fn test_report_args() {
        assert_eq!(
            Report::TopNodes.args(Scope::AllNamespaces, "dev.conf"),
            ["top", "node", "--kubeconfig", "dev.conf"]
        );
        assert_eq!(
            Report::TopPods.args(Scope::AllNamespaces, "dev.conf"),
            ["top", "pods", "-A", "--kubeconfig", "dev.conf"]
        );
        assert_eq!(
            Report::TopPods.args(Scope::CurrentNamespace, "dev.conf"),
            ["top", "pods", "--kubeconfig", "dev.conf"]
        );
        assert_eq!(
            Report::PodDetails.args(Scope::AllNamespaces, "dev.conf"),
            ["get", "pods", "-A", "-o", "json", "--kubeconfig", "dev.conf"]
        );
        assert_eq!(
            Report::PodDetails.args(Scope::CurrentNamespace, "dev.conf"),
            ["get", "pods", "-o", "json", "--kubeconfig", "dev.conf"]
        );
    }
}

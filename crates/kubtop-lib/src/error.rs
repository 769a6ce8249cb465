//! Error types for report collection and aggregation

use std::process::ExitStatus;
use thiserror::Error;

/// Failure to run the external report tool
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to capture output of `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to turn report output into records
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{report} report contained no entries")]
    NoEntries { report: &'static str },

    #[error("invalid number {token:?} in {report} report: {source}")]
    InvalidNumber {
        report: &'static str,
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("report output is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("failed to decode pod list: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("pod {namespace}/{name} declares no containers")]
    NoContainers { namespace: String, name: String },
}

/// Stage of an overview query, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NodeMetrics,
    WorkloadMetrics,
    WorkloadDetails,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NodeMetrics => "node_metrics",
            Stage::WorkloadMetrics => "workload_metrics",
            Stage::WorkloadDetails => "workload_details",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by an overview query. Any variant aborts the whole query.
#[derive(Debug, Error)]
pub enum KubtopError {
    #[error("{stage}: {source}")]
    Run {
        stage: Stage,
        #[source]
        source: RunError,
    },

    #[error("{stage}: {source}")]
    Parse {
        stage: Stage,
        #[source]
        source: ParseError,
    },
}

impl KubtopError {
    /// The query stage that failed
    pub fn stage(&self) -> Stage {
        match self {
            KubtopError::Run { stage, .. } | KubtopError::Parse { stage, .. } => *stage,
        }
    }
}

pub type Result<T, E = KubtopError> = std::result::Result<T, E>;

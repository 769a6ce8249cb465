//! `kubectl top` table parsing
//!
//! Both reports are fixed-column text. Each data line is matched against an
//! anchored pattern; headers, blank lines and warnings simply do not match.
//!
//! Node report:
//! ```text
//! NAME     CPU(cores)   CPU%   MEMORY(bytes)   MEMORY%
//! node-1   500m         10%    1024Mi          20%
//! ```
//!
//! Pod report (`-A` adds the leading NAMESPACE column):
//! ```text
//! NAMESPACE   NAME    CPU(cores)   MEMORY(bytes)
//! default     pod-a   100m         256Mi
//! ```

use super::{EmptyReportPolicy, Scope};
use crate::error::ParseError;
use crate::models::{NodeMetrics, WorkloadMetrics};
use regex::{Captures, Regex};
use std::sync::OnceLock;

const NODE_REPORT: &str = "top node";
const POD_REPORT: &str = "top pods";

fn node_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(\S+)[ \t]+([0-9]+)m[ \t]+([0-9]+)%[ \t]+([0-9]+)Mi[ \t]+([0-9]+)%")
            .expect("node line pattern is valid")
    })
}

fn namespaced_pod_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(\S+)[ \t]+(\S+)[ \t]+([0-9]+)m[ \t]+([0-9]+)Mi")
            .expect("namespaced pod line pattern is valid")
    })
}

fn scoped_pod_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(\S+)[ \t]+([0-9]+)m[ \t]+([0-9]+)Mi")
            .expect("scoped pod line pattern is valid")
    })
}

/// Parse `kubectl top node` output, preserving line order
pub fn parse_top_nodes(
    text: &str,
    policy: EmptyReportPolicy,
) -> Result<Vec<NodeMetrics>, ParseError> {
    let nodes = node_line()
        .captures_iter(text)
        .map(|caps| {
            Ok(NodeMetrics {
                name: caps[1].to_string(),
                cpu_millicores: number(&caps, 2, NODE_REPORT)?,
                cpu_percent: number(&caps, 3, NODE_REPORT)?,
                memory_mib: number(&caps, 4, NODE_REPORT)?,
                memory_percent: number(&caps, 5, NODE_REPORT)?,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    check_empty(nodes, policy, NODE_REPORT)
}

/// Parse `kubectl top pods` output, preserving line order.
///
/// With [`Scope::AllNamespaces`] the first column is the namespace; otherwise
/// the namespace is left empty.
pub fn parse_top_pods(
    text: &str,
    scope: Scope,
    policy: EmptyReportPolicy,
) -> Result<Vec<WorkloadMetrics>, ParseError> {
    let pods = match scope {
        Scope::AllNamespaces => namespaced_pod_line()
            .captures_iter(text)
            .map(|caps| {
                Ok(WorkloadMetrics {
                    namespace: caps[1].to_string(),
                    name: caps[2].to_string(),
                    cpu_millicores: number(&caps, 3, POD_REPORT)?,
                    memory_mib: number(&caps, 4, POD_REPORT)?,
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?,
        Scope::CurrentNamespace => scoped_pod_line()
            .captures_iter(text)
            .map(|caps| {
                Ok(WorkloadMetrics {
                    namespace: String::new(),
                    name: caps[1].to_string(),
                    cpu_millicores: number(&caps, 2, POD_REPORT)?,
                    memory_mib: number(&caps, 3, POD_REPORT)?,
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?,
    };

    check_empty(pods, policy, POD_REPORT)
}

/// Digits matched by the grammar can still overflow `u64`
fn number(caps: &Captures<'_>, group: usize, report: &'static str) -> Result<u64, ParseError> {
    let token = &caps[group];
    token.parse().map_err(|source| ParseError::InvalidNumber {
        report,
        token: token.to_string(),
        source,
    })
}

fn check_empty<T>(
    records: Vec<T>,
    policy: EmptyReportPolicy,
    report: &'static str,
) -> Result<Vec<T>, ParseError> {
    if records.is_empty() && policy == EmptyReportPolicy::Reject {
        return Err(ParseError::NoEntries { report });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOP_NODE: &str = "\
NAME     CPU(cores)   CPU%   MEMORY(bytes)   MEMORY%
node-1   500m         10%    1024Mi          20%
node-2   1250m        62%    7003Mi          91%
node-3   3m           0%     12Mi            1%
";

    #[test]
    fn test_parse_top_nodes_in_order() {
        let nodes = parse_top_nodes(TOP_NODE, EmptyReportPolicy::Reject).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(
            nodes[0],
            NodeMetrics {
                name: "node-1".to_string(),
                cpu_millicores: 500,
                cpu_percent: 10,
                memory_mib: 1024,
                memory_percent: 20,
            }
        );
        assert_eq!(nodes[1].name, "node-2");
        assert_eq!(nodes[1].cpu_percent, 62);
        assert_eq!(nodes[2].name, "node-3");
        assert_eq!(nodes[2].memory_mib, 12);
    }

    #[test]
    fn test_parse_top_nodes_overcommitted_percent() {
        let text = "node-1   4100m   102%   9000Mi   113%\n";
        let nodes = parse_top_nodes(text, EmptyReportPolicy::Reject).unwrap();
        assert_eq!(nodes[0].cpu_percent, 102);
        assert_eq!(nodes[0].memory_percent, 113);
    }

    #[test]
    fn test_parse_top_nodes_skips_noise() {
        let text = "\
W1019 10:00:00.000000   123 top_node.go:119] Using json format to get metrics
NAME     CPU(cores)   CPU%   MEMORY(bytes)   MEMORY%

node-1   500m         10%    1024Mi          20%
node-2   <unknown>    <unknown>   <unknown>   <unknown>
";
        let nodes = parse_top_nodes(text, EmptyReportPolicy::Reject).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "node-1");
    }

    #[test]
    fn test_record_never_spans_two_lines() {
        let text = "node-x\n500m  10%  1024Mi  20%\n";
        let nodes = parse_top_nodes(text, EmptyReportPolicy::Allow).unwrap();
        assert!(nodes.is_empty());

        let text = "default\npod-a   100m   256Mi\n";
        let pods = parse_top_pods(text, Scope::AllNamespaces, EmptyReportPolicy::Allow).unwrap();
        assert!(pods.is_empty());

        let text = "pod-a\n100m   256Mi\n";
        let pods = parse_top_pods(text, Scope::CurrentNamespace, EmptyReportPolicy::Allow).unwrap();
        assert!(pods.is_empty());
    }

    #[test]
    fn test_tab_separated_columns() {
        let nodes = parse_top_nodes("node-1\t500m\t10%\t1024Mi\t20%\n", EmptyReportPolicy::Reject)
            .unwrap();
        assert_eq!(nodes[0].name, "node-1");
        assert_eq!(nodes[0].memory_percent, 20);
    }

    #[test]
    fn test_parse_top_nodes_overflow_is_error() {
        let text = "node-1   99999999999999999999999m   10%   1024Mi   20%\n";
        let err = parse_top_nodes(text, EmptyReportPolicy::Reject).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { .. }));
    }

    // An empty cluster is indistinguishable from a misinvoked tool, so the
    // default policy rejects it like the original dashboard did. Callers that
    // want an empty list opt in with `EmptyReportPolicy::Allow`.
    #[test]
    fn test_zero_matching_lines_rejected_by_default() {
        let text = "NAME   CPU(cores)   CPU%   MEMORY(bytes)   MEMORY%\n";
        let err = parse_top_nodes(text, EmptyReportPolicy::default()).unwrap_err();
        assert!(matches!(err, ParseError::NoEntries { report: "top node" }));
        assert_eq!(err.to_string(), "top node report contained no entries");

        let err = parse_top_pods("", Scope::AllNamespaces, EmptyReportPolicy::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::NoEntries { report: "top pods" }));
    }

    #[test]
    fn test_zero_matching_lines_allowed_when_opted_in() {
        let nodes = parse_top_nodes("", EmptyReportPolicy::Allow).unwrap();
        assert!(nodes.is_empty());

        let pods = parse_top_pods(
            "No resources found in default namespace.\n",
            Scope::CurrentNamespace,
            EmptyReportPolicy::Allow,
        )
        .unwrap();
        assert!(pods.is_empty());
    }

    #[test]
    fn test_parse_top_pods_all_namespaces() {
        let text = "\
NAMESPACE     NAME                      CPU(cores)   MEMORY(bytes)
default       pod-a                     100m         256Mi
kube-system   coredns-5d78c9869d-8x2lq  4m           17Mi
";
        let pods = parse_top_pods(text, Scope::AllNamespaces, EmptyReportPolicy::Reject).unwrap();
        assert_eq!(pods.len(), 2);
        assert_eq!(
            pods[0],
            WorkloadMetrics {
                namespace: "default".to_string(),
                name: "pod-a".to_string(),
                cpu_millicores: 100,
                memory_mib: 256,
            }
        );
        assert_eq!(pods[1].namespace, "kube-system");
        assert_eq!(pods[1].name, "coredns-5d78c9869d-8x2lq");
        assert_eq!(pods[1].cpu_millicores, 4);
    }

    #[test]
    fn test_parse_top_pods_scoped_has_empty_namespace() {
        let text = "\
NAME    CPU(cores)   MEMORY(bytes)
pod-a   100m         256Mi
pod-b   0m           3Mi
";
        let pods =
            parse_top_pods(text, Scope::CurrentNamespace, EmptyReportPolicy::Reject).unwrap();
        assert_eq!(pods.len(), 2);
        assert!(pods.iter().all(|p| p.namespace.is_empty()));
        assert_eq!(pods[0].name, "pod-a");
        assert_eq!(pods[1].name, "pod-b");
        assert_eq!(pods[1].memory_mib, 3);
    }

    #[test]
    fn test_scoped_grammar_does_not_accept_namespaced_lines() {
        let text = "default   pod-a   100m   256Mi\n";
        let err = parse_top_pods(text, Scope::CurrentNamespace, EmptyReportPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, ParseError::NoEntries { .. }));
    }
}

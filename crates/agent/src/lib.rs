//! kubtop agent: keeps a cluster overview fresh and serves it with health
//! probes and Prometheus metrics.

pub mod api;
pub mod config;

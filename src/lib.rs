//! # prestowatch
//!
//! A Prometheus exporter for Presto (and Trino) coordinators.
//!
//! Two independent loops poll the coordinator's HTTP status API. The
//! cluster poller mirrors `/v1/cluster` into gauges; the query poller turns
//! recently finished queries from `/v1/query` into elapsed and execution
//! time histograms. Both write into one shared registry, which the metrics
//! endpoint renders on every scrape.
//!
//! ```text
//!   /v1/cluster ──▶ ClusterPoller ──┐
//!                                   ├──▶ Registry ──▶ GET /metrics
//!   /v1/query ───▶ QueryPoller ─────┘
//! ```
//!
//! - **[`poller`]**: the poll loops, the observation window and dedup
//! - **[`backoff`]**: retry delays after failed polls
//! - **[`config`]** and **[`cli`]**: layered configuration
//! - **[`metrics`]**: names and help text of the published metrics
//! - **[`app`]**: wiring everything together
//!
//! ## Usage
//!
//! ```bash
//! prestowatch --presto-http-url http://presto-coordinator:8080 --port 9988
//! ```

pub mod app;
pub mod backoff;
pub mod cli;
pub mod config;
pub mod metrics;
pub mod poller;

pub use config::{ExporterConfig, Settings};

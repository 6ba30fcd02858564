//! Names and help text of every metric the exporter publishes.

use prestowatch_sdk::{Registry, RegistryError, DEFAULT_BUCKETS};

pub const RUNNING_QUERIES: &str = "running_queries";
pub const ACTIVE_WORKERS: &str = "active_workers";

/// Only published once a coordinator reports it.
pub const QUEUED_QUERIES: &str = "queued_queries";
/// Only published once a coordinator reports it.
pub const BLOCKED_QUERIES: &str = "blocked_queries";

pub const QUERY_ELAPSED_SECONDS: &str = "query_elapsed_time_seconds";
pub const QUERY_EXECUTION_SECONDS: &str = "query_execution_time_seconds";

const GAUGES: &[(&str, &str)] = &[
    (RUNNING_QUERIES, "Number of running queries"),
    (ACTIVE_WORKERS, "Number of active presto workers"),
];

const OPTIONAL_GAUGES: &[(&str, &str)] = &[
    (QUEUED_QUERIES, "Number of queued queries"),
    (BLOCKED_QUERIES, "Number of blocked queries"),
];

const HISTOGRAMS: &[(&str, &str)] = &[
    (
        QUERY_ELAPSED_SECONDS,
        "Duration of query elapsed time in seconds.",
    ),
    (
        QUERY_EXECUTION_SECONDS,
        "Duration of query execution time in seconds.",
    ),
];

/// Declare the always-present metrics so they render from the first scrape.
///
/// Optional gauges only get their help text here; they are created when a
/// coordinator first reports them.
pub fn register(registry: &Registry) -> Result<(), RegistryError> {
    for (name, help) in GAUGES {
        registry.register_gauge(name, help)?;
    }
    for (name, help) in OPTIONAL_GAUGES {
        registry.describe(name, help);
    }
    for (name, help) in HISTOGRAMS {
        registry.register_histogram(name, help, DEFAULT_BUCKETS)?;
    }
    Ok(())
}

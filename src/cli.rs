use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use prestowatch_types::parse_duration;

use crate::poller::DedupStrategy;

/// Command-line flags. Each one, when given, overrides the config file and
/// the environment.
#[derive(Parser, Debug, Default)]
#[command(name = "prestowatch")]
#[command(about = "Prometheus exporter for Presto cluster and query statistics")]
#[command(version)]
pub struct Args {
    /// Base URL of the Presto coordinator (e.g. http://presto:8080)
    #[arg(long = "presto-http-url", value_name = "URL")]
    pub presto_url: Option<String>,

    /// Port to serve metrics on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level or tracing filter directive (e.g. "debug")
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How often to poll /v1/cluster (e.g. "10s")
    #[arg(long, value_parser = parse_duration)]
    pub cluster_interval: Option<Duration>,

    /// How often to poll /v1/query (e.g. "60s")
    #[arg(long, value_parser = parse_duration)]
    pub query_interval: Option<Duration>,

    /// How far back a finished query still counts (defaults to the query interval)
    #[arg(long, value_parser = parse_duration)]
    pub query_window: Option<Duration>,

    /// How to avoid counting a finished query twice
    #[arg(long, value_enum)]
    pub dedup: Option<DedupStrategy>,
}

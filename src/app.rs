//! Wiring: one registry, one metrics server, two poll loops.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use prestowatch_adapters::presto::PrestoAdapter;
use prestowatch_adapters::{AdapterError, StatsSource};
use prestowatch_sdk::prometheus::{PrometheusConfig, PrometheusExporter};
use prestowatch_sdk::{Recorder, Registry};
use tokio::task::{JoinError, JoinHandle};
use tracing::info;

use crate::config::ExporterConfig;
use crate::metrics;
use crate::poller::{run_poll_loop, ClusterPoller, ObservationWindow, QueryPoller};

/// A started exporter.
pub struct Running {
    pub local_addr: SocketAddr,
    server: JoinHandle<()>,
    cluster: JoinHandle<AdapterError>,
    query: JoinHandle<AdapterError>,
}

impl Running {
    /// Wait until a task stops or the process is interrupted.
    ///
    /// The poll loops and the server run forever, so any of them finishing
    /// is reported as an error.
    pub async fn wait(mut self) -> Result<()> {
        let result = tokio::select! {
            res = &mut self.cluster => Err(stopped("cluster", res)),
            res = &mut self.query => Err(stopped("query", res)),
            res = &mut self.server => Err(match res {
                Ok(()) => anyhow!("metrics server stopped"),
                Err(e) => anyhow!("metrics server failed: {}", e),
            }),
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    info!("shutting down");
                    Ok(())
                }
                Err(e) => Err(anyhow::Error::new(e).context("failed to listen for shutdown signal")),
            },
        };

        self.shutdown();
        result
    }

    pub fn shutdown(&self) {
        self.cluster.abort();
        self.query.abort();
        self.server.abort();
    }
}

fn stopped(poller: &str, res: Result<AdapterError, JoinError>) -> anyhow::Error {
    match res {
        Ok(e) => anyhow::Error::new(e).context(format!("{} poller stopped", poller)),
        Err(e) => anyhow!("{} poller panicked: {}", poller, e),
    }
}

/// Build the coordinator client from config.
///
/// An invalid base URL fails here, before anything is started.
pub fn build_adapter(config: &ExporterConfig) -> Result<PrestoAdapter> {
    let mut builder = PrestoAdapter::builder()
        .endpoint(&config.presto_url)
        .timeout(config.request_timeout);
    if let Some(user) = &config.presto_user {
        builder = builder.user(user);
    }
    let adapter = builder.build().context("invalid presto_url")?;
    info!(endpoint = adapter.endpoint(), "presto client configured");
    Ok(adapter)
}

/// Bind the metrics endpoint and spawn both poll loops against `source`.
pub async fn start(config: &ExporterConfig, source: Arc<dyn StatsSource>) -> Result<Running> {
    let registry = Arc::new(Registry::with_namespace(
        config.namespace.clone().unwrap_or_default(),
    ));
    metrics::register(&registry).context("failed to register metrics")?;

    let exporter_config = PrometheusConfig::builder()
        .listen_addr(&config.listen_addr)
        .metrics_path(&config.metrics_path)
        .build();
    let server = PrometheusExporter::new(exporter_config, registry.clone())
        .start_server()
        .await
        .context("failed to start metrics server")?;

    let recorder: Arc<dyn Recorder> = registry.clone();
    let cluster = ClusterPoller::new(source.clone(), recorder.clone());
    let query = QueryPoller::new(source, recorder, ObservationWindow::new(config.query_window))
        .with_dedup(config.dedup);

    info!(
        cluster_interval = ?config.cluster_interval,
        query_interval = ?config.query_interval,
        query_window = ?config.query_window,
        dedup = ?config.dedup,
        "polling started"
    );

    let cluster = tokio::spawn(run_poll_loop(
        cluster,
        config.cluster_interval,
        config.cluster_backoff,
    ));
    let query = tokio::spawn(run_poll_loop(
        query,
        config.query_interval,
        config.query_backoff,
    ));

    Ok(Running {
        local_addr: server.local_addr,
        server: server.handle,
        cluster,
        query,
    })
}

/// Run the exporter until interrupted or a task stops.
pub async fn run(config: ExporterConfig) -> Result<()> {
    let adapter = build_adapter(&config)?;
    let running = start(&config, Arc::new(adapter)).await?;
    running.wait().await
}

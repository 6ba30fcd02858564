//! Prometheus scrape endpoint.
//!
//! Serves the registry in the Prometheus text-based exposition format over
//! HTTP for scraping by Prometheus or compatible monitoring systems.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use prestowatch_sdk::Registry;
//! use prestowatch_sdk::prometheus::{PrometheusConfig, PrometheusExporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(Registry::with_namespace("presto"));
//!     registry.register_gauge("running_queries", "Number of running queries")?;
//!
//!     let config = PrometheusConfig::builder()
//!         .listen_addr("0.0.0.0:9988")
//!         .metrics_path("/metrics")
//!         .build();
//!
//!     let server = PrometheusExporter::new(config, registry).start_server().await?;
//!
//!     // Metrics available at http://localhost:9988/metrics
//!     server.handle.await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::state::{Registry, RegistryError};

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Errors starting the metrics endpoint.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address is not a valid socket address.
    #[error("invalid listen address {addr:?}: {source}")]
    InvalidAddr {
        addr: String,
        source: std::net::AddrParseError,
    },

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// Configuration for Prometheus metrics endpoint.
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Address to listen on (e.g., "0.0.0.0:9988")
    pub listen_addr: String,
    /// Path for metrics endpoint (e.g., "/metrics")
    pub metrics_path: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9988".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

impl PrometheusConfig {
    /// Create a new builder for PrometheusConfig.
    pub fn builder() -> PrometheusConfigBuilder {
        PrometheusConfigBuilder::default()
    }
}

/// Builder for PrometheusConfig.
#[derive(Debug, Default)]
pub struct PrometheusConfigBuilder {
    listen_addr: Option<String>,
    metrics_path: Option<String>,
}

impl PrometheusConfigBuilder {
    /// Set the listen address.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Set the metrics path.
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    /// Build the PrometheusConfig.
    pub fn build(self) -> PrometheusConfig {
        PrometheusConfig {
            listen_addr: self
                .listen_addr
                .unwrap_or_else(|| "0.0.0.0:9988".to_string()),
            metrics_path: self.metrics_path.unwrap_or_else(|| "/metrics".to_string()),
        }
    }
}

/// Prometheus exporter that serves the registry over HTTP.
#[derive(Debug, Clone)]
pub struct PrometheusExporter {
    config: PrometheusConfig,
    registry: Arc<Registry>,
}

/// A running metrics server.
#[derive(Debug)]
pub struct ServerHandle {
    /// The address actually bound (useful with port 0).
    pub local_addr: SocketAddr,
    /// The accept loop. It only finishes if aborted.
    pub handle: JoinHandle<()>,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter.
    pub fn new(config: PrometheusConfig, registry: Arc<Registry>) -> Self {
        Self { config, registry }
    }

    /// Get the current metrics in Prometheus exposition format.
    pub fn render(&self) -> Result<String, RegistryError> {
        self.registry.render()
    }

    /// Bind the listener and start serving metrics.
    ///
    /// Binding happens before this returns, so a bad address or a port in use
    /// is reported to the caller. The accept loop then runs in a background
    /// task until the runtime shuts down.
    pub async fn start_server(&self) -> Result<ServerHandle, ServerError> {
        let addr: SocketAddr =
            self.config
                .listen_addr
                .parse()
                .map_err(|source| ServerError::InvalidAddr {
                    addr: self.config.listen_addr.clone(),
                    source,
                })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().unwrap_or(addr);

        info!(%local_addr, path = %self.config.metrics_path, "serving metrics");

        let exporter = self.clone();
        let handle = tokio::spawn(async move { exporter.accept_loop(listener).await });

        Ok(ServerHandle { local_addr, handle })
    }

    async fn accept_loop(self, listener: TcpListener) {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept metrics connection");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let exporter = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let exporter = exporter.clone();
                    async move { Ok::<_, Infallible>(exporter.handle_request(&req)) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(%peer, error = %e, "metrics connection error");
                }
            });
        }
    }

    fn handle_request<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let path = req.uri().path();

        if path == self.config.metrics_path {
            match self.render() {
                Ok(body) => text_response(StatusCode::OK, TEXT_FORMAT, body),
                Err(e) => {
                    error!(error = %e, "failed to render metrics");
                    text_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "text/plain",
                        "Internal Server Error",
                    )
                }
            }
        } else if path == "/health" || path == "/healthz" {
            text_response(StatusCode::OK, "text/plain", "OK")
        } else {
            text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found")
        }
    }
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

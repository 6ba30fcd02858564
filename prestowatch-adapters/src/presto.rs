//! Presto adapter using the coordinator's HTTP status API.
//!
//! ## Endpoints
//!
//! - **`/v1/cluster`**: running query and active worker counts
//! - **`/v1/query`**: every query the coordinator still remembers, running
//!   or finished, with its timing stats
//!
//! ## Example
//!
//! ```rust,no_run
//! use prestowatch_adapters::presto::PrestoAdapter;
//! use prestowatch_adapters::StatsSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = PrestoAdapter::builder()
//!         .endpoint("http://localhost:8080")
//!         .build()?;
//!
//!     let stats = adapter.cluster_stats().await?;
//!     println!("{} queries on {} workers", stats.running_queries, stats.active_workers);
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};

use prestowatch_types::{ClusterStats, QueryInfo};

use crate::source::{decode_cluster, decode_queries, StatsSource, CLUSTER_PATH, QUERY_PATH};
use crate::AdapterError;

/// Header carrying the user name the coordinator attributes requests to.
const USER_HEADER: &str = "X-Presto-User";

/// Presto adapter for fetching coordinator status.
#[derive(Debug, Clone)]
pub struct PrestoAdapter {
    client: Client,
    endpoint: String,
    user: Option<String>,
}

impl PrestoAdapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> PrestoAdapterBuilder {
        PrestoAdapterBuilder::default()
    }

    /// The base URL requests are made against, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue a GET for `path` and return the raw body.
    pub async fn fetch_raw(&self, path: &str) -> Result<Bytes, AdapterError> {
        let url = format!("{}{}", self.endpoint, path);

        let mut request = self.client.get(&url);
        if let Some(user) = &self.user {
            request = request.header(USER_HEADER, user);
        }

        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AdapterError::Auth(format!("{} rejected credentials", url)));
        }

        if !response.status().is_success() {
            return Err(AdapterError::Http(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl StatsSource for PrestoAdapter {
    async fn cluster_stats(&self) -> Result<ClusterStats, AdapterError> {
        let body = self.fetch_raw(CLUSTER_PATH).await?;
        decode_cluster(&body)
    }

    async fn queries(&self) -> Result<Vec<QueryInfo>, AdapterError> {
        let body = self.fetch_raw(QUERY_PATH).await?;
        decode_queries(&body)
    }
}

/// Builder for PrestoAdapter.
#[derive(Debug, Default)]
pub struct PrestoAdapterBuilder {
    endpoint: Option<String>,
    user: Option<String>,
    timeout: Option<Duration>,
    no_proxy: bool,
}

impl PrestoAdapterBuilder {
    /// Set the coordinator base URL (e.g., "http://localhost:8080").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Send `X-Presto-User` with every request.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the request timeout (default: 5 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ignore proxy settings from the environment.
    pub fn no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    /// Build the adapter.
    ///
    /// Fails if the base URL cannot be parsed or is not http(s); this is a
    /// static misconfiguration and should stop the process.
    pub fn build(self) -> Result<PrestoAdapter, AdapterError> {
        let raw = self
            .endpoint
            .unwrap_or_else(|| "http://localhost:8080".to_string());
        let endpoint = validate_endpoint(&raw)?;

        let mut client = Client::builder().timeout(self.timeout.unwrap_or(Duration::from_secs(5)));
        if self.no_proxy {
            client = client.no_proxy();
        }
        let client = client.build().map_err(|e| AdapterError::InvalidUrl {
            url: raw.clone(),
            reason: format!("cannot build HTTP client: {}", e),
        })?;

        Ok(PrestoAdapter {
            client,
            endpoint,
            user: self.user,
        })
    }
}

fn validate_endpoint(raw: &str) -> Result<String, AdapterError> {
    let invalid = |reason: String| AdapterError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query strings and fragments are not allowed".to_string()));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

//! The fetch-and-decode seam used by pollers.

use async_trait::async_trait;
use prestowatch_types::{ClusterStats, QueryInfo};

use crate::AdapterError;

/// Path of the cluster status endpoint, relative to the base URL.
pub const CLUSTER_PATH: &str = "/v1/cluster";

/// Path of the query listing endpoint, relative to the base URL.
pub const QUERY_PATH: &str = "/v1/query";

/// A provider of decoded coordinator status.
///
/// Each call is one complete request: it either yields a fully decoded
/// value or an error, never a partial result.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetch and decode `/v1/cluster`.
    async fn cluster_stats(&self) -> Result<ClusterStats, AdapterError>;

    /// Fetch and decode `/v1/query`.
    async fn queries(&self) -> Result<Vec<QueryInfo>, AdapterError>;
}

/// Decode a `/v1/cluster` response body.
pub fn decode_cluster(body: &[u8]) -> Result<ClusterStats, AdapterError> {
    Ok(serde_json::from_slice(body)?)
}

/// Decode a `/v1/query` response body.
pub fn decode_queries(body: &[u8]) -> Result<Vec<QueryInfo>, AdapterError> {
    Ok(serde_json::from_slice(body)?)
}

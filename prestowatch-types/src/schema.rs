//! Response shapes of the coordinator's `/v1/cluster` and `/v1/query` endpoints.
//!
//! Both pollers decode into these types. Unknown fields are ignored so the
//! exporter keeps working across Presto and Trino releases that add fields.

use serde::{Deserialize, Deserializer, Serialize};

/// Aggregate cluster state from `GET /v1/cluster`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStats {
    /// Number of queries currently running.
    pub running_queries: f64,

    /// Number of workers currently active.
    pub active_workers: f64,

    /// Number of queries waiting in a resource group queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued_queries: Option<f64>,

    /// Number of running queries blocked on input or memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_queries: Option<f64>,
}

/// One entry of the `GET /v1/query` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInfo {
    #[serde(default, deserialize_with = "string_or_null")]
    pub query_id: String,

    #[serde(default, deserialize_with = "string_or_null")]
    pub query: String,

    /// Lifecycle state (`QUEUED`, `RUNNING`, `FINISHED`, `FAILED`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    pub query_stats: QueryStats,
}

impl QueryInfo {
    /// A query is finished once the coordinator reports an end time.
    pub fn is_finished(&self) -> bool {
        !self.query_stats.end_time.is_empty()
    }
}

/// Timing fields of a query. All values are strings as sent on the wire;
/// `end_time` is empty while the query is still running.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    #[serde(default, deserialize_with = "string_or_null")]
    pub elapsed_time: String,

    #[serde(default, deserialize_with = "string_or_null")]
    pub create_time: String,

    #[serde(default, deserialize_with = "string_or_null")]
    pub end_time: String,

    #[serde(default, deserialize_with = "string_or_null")]
    pub execution_time: String,
}

// Presto sends `null` for unset fields; treat it the same as an absent field.
fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

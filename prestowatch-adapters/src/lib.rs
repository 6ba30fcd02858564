//! # prestowatch-adapters
//!
//! Adapters for fetching and decoding status from a Presto coordinator.
//!
//! The [`StatsSource`] trait is what pollers depend on: one call, one
//! request, one fully decoded value or an [`AdapterError`]. The `presto`
//! feature provides [`presto::PrestoAdapter`], the reqwest-based
//! implementation that talks to a real coordinator.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "presto")]
//! # async fn run() -> Result<(), prestowatch_adapters::AdapterError> {
//! use prestowatch_adapters::presto::PrestoAdapter;
//! use prestowatch_adapters::StatsSource;
//! use std::time::Duration;
//!
//! let adapter = PrestoAdapter::builder()
//!     .endpoint("http://presto-coordinator:8080")
//!     .timeout(Duration::from_secs(5))
//!     .build()?;
//!
//! let queries = adapter.queries().await?;
//! println!("coordinator reports {} queries", queries.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod source;

#[cfg(feature = "presto")]
pub mod presto;

pub use error::AdapterError;
pub use source::{decode_cluster, decode_queries, StatsSource, CLUSTER_PATH, QUERY_PATH};

// Re-export types for convenience
pub use prestowatch_types::{ClusterStats, QueryInfo, QueryStats};

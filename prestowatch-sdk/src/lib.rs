//! # prestowatch-sdk
//!
//! Metric recording and exposition for prestowatch.
//!
//! The [`Registry`] is the single process-wide accumulation point for gauge
//! and histogram state, built on the `prometheus` crate. Pollers write to it
//! through the [`Recorder`] trait; the [`prometheus`] module serves it for
//! scraping.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use prestowatch_sdk::{Recorder, Registry, DEFAULT_BUCKETS};
//!
//! let registry = Arc::new(Registry::new());
//! let running = registry
//!     .register_gauge("running_queries", "Number of running queries")
//!     .unwrap();
//! registry
//!     .register_histogram(
//!         "query_elapsed_time_seconds",
//!         "Duration of query elapsed time in seconds.",
//!         DEFAULT_BUCKETS,
//!     )
//!     .unwrap();
//!
//! let recorder: Arc<dyn Recorder> = registry.clone();
//! recorder.set_gauge("running_queries", 4.0);
//! recorder.observe("query_elapsed_time_seconds", 5.2);
//!
//! assert_eq!(running.get(), 4.0);
//! assert!(registry.render().unwrap().contains("running_queries 4\n"));
//! ```
//!
//! ## Features
//!
//! - **Thread-safe**: record from any thread or async task
//! - **One kind per name**: a gauge name cannot be reused for a histogram
//! - **Prometheus endpoint** (`server` feature): hyper-based `/metrics` server

mod recorder;
mod state;

#[cfg(feature = "server")]
pub mod prometheus;

pub use recorder::Recorder;
pub use state::{MetricKind, Registry, RegistryError};

// Re-export the metric handles for convenience
pub use ::prometheus::{Gauge, Histogram, DEFAULT_BUCKETS};

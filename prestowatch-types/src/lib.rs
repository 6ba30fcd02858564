//! # prestowatch-types
//!
//! Core types shared by the prestowatch crates. This crate defines the
//! response schema of the Presto coordinator's status API and the parsers
//! that turn its free-form string fields into numbers.
//!
//! ## Design Goals
//!
//! - **One schema**: the cluster and query pollers decode into the same types
//! - **Per-field parsing**: a bad timestamp or duration fails only that field
//! - **Plain data**: serde derives only, no I/O
//!
//! ## Example
//!
//! ```rust
//! use prestowatch_types::{parse_duration, QueryInfo};
//!
//! let json = r#"{
//!     "queryId": "20180601_132802_00001_abcde",
//!     "query": "SELECT 1",
//!     "queryStats": {
//!         "elapsedTime": "5.20s",
//!         "createTime": "2018-06-01T13:27:57.205Z",
//!         "endTime": "2018-06-01T13:28:02.405Z",
//!         "executionTime": "4.90s"
//!     }
//! }"#;
//!
//! let info: QueryInfo = serde_json::from_str(json).unwrap();
//! assert!(info.is_finished());
//!
//! let elapsed = parse_duration(&info.query_stats.elapsed_time).unwrap();
//! assert_eq!(elapsed.as_millis(), 5200);
//! ```

mod duration;
mod error;
mod schema;
mod timestamp;

pub use duration::*;
pub use error::ValueError;
pub use schema::*;
pub use timestamp::*;

//! Absolute timestamps, e.g. `2018-06-01T13:28:02.405Z`.

use chrono::{DateTime, Utc};

use crate::ValueError;

/// Parse an RFC3339 timestamp (fractional seconds optional) into UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ValueError> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ValueError::Timestamp {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

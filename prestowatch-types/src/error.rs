//! Error types for value parsing.

use thiserror::Error;

/// A string field from the status API could not be converted to a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The field is not a valid duration string.
    #[error("invalid duration {input:?}: {reason}")]
    Duration { input: String, reason: &'static str },

    /// The field is not a valid RFC3339 timestamp.
    #[error("invalid timestamp {input:?}: {reason}")]
    Timestamp { input: String, reason: String },
}

impl ValueError {
    pub(crate) fn duration(input: &str, reason: &'static str) -> Self {
        ValueError::Duration {
            input: input.to_string(),
            reason,
        }
    }

    /// The raw input that failed to parse.
    pub fn input(&self) -> &str {
        match self {
            ValueError::Duration { input, .. } | ValueError::Timestamp { input, .. } => input,
        }
    }
}

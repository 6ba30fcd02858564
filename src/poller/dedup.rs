//! Cross-cycle duplicate suppression for finished queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Deserialize;

use super::window::ObservationWindow;

/// How the query poller avoids counting a finished query twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DedupStrategy {
    /// Rely on the window alone. Correct only while the window matches the
    /// poll interval; a record seen in two overlapping windows counts twice.
    #[default]
    Window,

    /// Also remember the IDs of counted queries until their end time leaves
    /// the window.
    SeenIds,
}

/// Query IDs already counted, with their end times.
#[derive(Debug, Default)]
pub struct SeenQueries {
    seen: HashMap<String, DateTime<Utc>>,
}

impl SeenQueries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a query. Returns false if it was already known.
    pub fn insert(&mut self, query_id: &str, end: DateTime<Utc>) -> bool {
        if self.contains(query_id) {
            return false;
        }
        self.seen.insert(query_id.to_string(), end);
        true
    }

    pub fn contains(&self, query_id: &str) -> bool {
        self.seen.contains_key(query_id)
    }

    /// Drop entries that can no longer be in any future window.
    ///
    /// Entries ending after `now` are kept.
    pub fn prune(&mut self, window: &ObservationWindow, now: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        self.seen
            .retain(|_, end| *end > now || window.contains(*end, now));
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 6, 1, 13, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn insert_reports_first_sighting_only() {
        let mut seen = SeenQueries::new();
        assert!(seen.is_empty());
        assert!(seen.insert("q1", t(0)));
        assert!(!seen.insert("q1", t(0)));
        assert!(seen.insert("q2", t(0)));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn prune_drops_entries_older_than_window() {
        let window = ObservationWindow::new(Duration::from_secs(60));
        let mut seen = SeenQueries::new();
        seen.insert("old", t(0));
        seen.insert("recent", t(50));
        seen.insert("future", t(200));

        let removed = seen.prune(&window, t(100));

        assert_eq!(removed, 1);
        assert!(!seen.contains("old"));
        assert!(seen.contains("recent"));
        assert!(seen.contains("future"));
    }

    #[test]
    fn strategy_names() {
        assert_eq!(
            DedupStrategy::from_str("seen-ids", false),
            Ok(DedupStrategy::SeenIds)
        );
        assert_eq!(DedupStrategy::default(), DedupStrategy::Window);
    }
}

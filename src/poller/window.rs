//! Deciding whether a finished query is new enough to count.

use std::time::Duration;

use chrono::{DateTime, Utc};
use prestowatch_types::{parse_timestamp, QueryInfo, ValueError};

/// The lookback interval ending at "now".
///
/// A completion counts when it happened no later than now and no more than
/// `size` before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationWindow {
    size: Duration,
}

impl ObservationWindow {
    pub fn new(size: Duration) -> Self {
        Self { size }
    }

    /// Whether `end` falls inside the window ending at `now`.
    pub fn contains(&self, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - end).to_std() {
            Ok(age) => age <= self.size,
            // negative age: the coordinator's clock is ahead of ours
            Err(_) => false,
        }
    }
}

/// Where a query record stands relative to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// No end time yet.
    Running,
    /// Finished, but before the window started or after now.
    OutsideWindow(DateTime<Utc>),
    /// Finished inside the window.
    InWindow(DateTime<Utc>),
}

/// Classify one record. Only a malformed end time is an error.
pub fn classify(
    info: &QueryInfo,
    window: &ObservationWindow,
    now: DateTime<Utc>,
) -> Result<Completion, ValueError> {
    if !info.is_finished() {
        return Ok(Completion::Running);
    }

    let end = parse_timestamp(&info.query_stats.end_time)?;
    if window.contains(end, now) {
        Ok(Completion::InWindow(end))
    } else {
        Ok(Completion::OutsideWindow(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use prestowatch_types::QueryStats;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 6, 1, 13, 30, 0).unwrap()
    }

    fn finished_at(end_time: &str) -> QueryInfo {
        QueryInfo {
            query_id: "q".to_string(),
            query: "SELECT 1".to_string(),
            state: None,
            query_stats: QueryStats {
                end_time: end_time.to_string(),
                ..QueryStats::default()
            },
        }
    }

    #[test]
    fn window_bounds() {
        let window = ObservationWindow::new(Duration::from_secs(60));
        let now = now();

        assert!(window.contains(now, now));
        assert!(window.contains(now - chrono::Duration::seconds(30), now));
        assert!(window.contains(now - chrono::Duration::seconds(60), now));
        assert!(!window.contains(now - chrono::Duration::milliseconds(60_001), now));
        assert!(!window.contains(now + chrono::Duration::seconds(1), now));
    }

    #[test]
    fn running_query_is_running_regardless_of_other_fields() {
        let window = ObservationWindow::new(Duration::from_secs(60));
        let mut info = finished_at("");
        info.query_stats.elapsed_time = "garbage".to_string();

        assert_eq!(classify(&info, &window, now()), Ok(Completion::Running));
    }

    #[test]
    fn recent_completion_is_in_window() {
        let window = ObservationWindow::new(Duration::from_secs(60));
        let info = finished_at("2018-06-01T13:29:30.000Z");

        match classify(&info, &window, now()).unwrap() {
            Completion::InWindow(end) => assert_eq!(end, now() - chrono::Duration::seconds(30)),
            other => panic!("expected InWindow, got {:?}", other),
        }
    }

    #[test]
    fn old_completion_is_outside_window() {
        let window = ObservationWindow::new(Duration::from_secs(60));
        let info = finished_at("2018-06-01T13:28:02.405Z");

        assert!(matches!(
            classify(&info, &window, now()),
            Ok(Completion::OutsideWindow(_))
        ));
    }

    #[test]
    fn malformed_end_time_is_an_error() {
        let window = ObservationWindow::new(Duration::from_secs(60));
        let err = classify(&finished_at("last tuesday"), &window, now()).unwrap_err();
        assert_eq!(err.input(), "last tuesday");
    }
}

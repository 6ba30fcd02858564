use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prestowatch_adapters::{AdapterError, QueryInfo, QueryStats, StatsSource};
use prestowatch_sdk::Recorder;
use prestowatch_types::{parse_duration, ValueError};
use tracing::{debug, warn};

use super::dedup::{DedupStrategy, SeenQueries};
use super::window::{classify, Completion, ObservationWindow};
use super::Poller;
use crate::metrics;

/// Parsed timing of a finished query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDuration {
    pub elapsed: Duration,
    pub execution: Duration,
}

impl QueryDuration {
    /// Both durations must parse; there are no partial results.
    pub fn from_stats(stats: &QueryStats) -> Result<Self, ValueError> {
        Ok(Self {
            elapsed: parse_duration(&stats.elapsed_time)?,
            execution: parse_duration(&stats.execution_time)?,
        })
    }
}

/// What one batch turned into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records that produced an observation pair.
    pub observed: usize,
    /// Records without an end time.
    pub running: usize,
    /// Finished records outside the observation window.
    pub outside_window: usize,
    /// Records skipped because a field failed to parse.
    pub malformed: usize,
    /// Records already counted in an earlier cycle.
    pub duplicate: usize,
}

/// Turns `/v1/query` listings into elapsed and execution time histograms.
pub struct QueryPoller {
    source: Arc<dyn StatsSource>,
    recorder: Arc<dyn Recorder>,
    window: ObservationWindow,
    dedup: DedupStrategy,
    seen: SeenQueries,
}

impl QueryPoller {
    pub fn new(
        source: Arc<dyn StatsSource>,
        recorder: Arc<dyn Recorder>,
        window: ObservationWindow,
    ) -> Self {
        Self {
            source,
            recorder,
            window,
            dedup: DedupStrategy::default(),
            seen: SeenQueries::new(),
        }
    }

    pub fn with_dedup(mut self, dedup: DedupStrategy) -> Self {
        self.dedup = dedup;
        self
    }

    /// Number of query IDs currently remembered for deduplication.
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Record every countable query in `records` as of `now`.
    ///
    /// A bad record is logged and skipped; the rest of the batch is still
    /// processed.
    pub fn process_batch(&mut self, records: &[QueryInfo], now: DateTime<Utc>) -> BatchSummary {
        let mut summary = BatchSummary::default();

        if self.dedup == DedupStrategy::SeenIds && !self.seen.is_empty() {
            let pruned = self.seen.prune(&self.window, now);
            if pruned > 0 {
                debug!(pruned, remaining = self.seen.len(), "pruned seen queries");
            }
        }

        for info in records {
            let end = match classify(info, &self.window, now) {
                Ok(Completion::InWindow(end)) => end,
                Ok(Completion::Running) => {
                    summary.running += 1;
                    continue;
                }
                Ok(Completion::OutsideWindow(_)) => {
                    summary.outside_window += 1;
                    continue;
                }
                Err(e) => {
                    warn!(poller = "query", query_id = %info.query_id, error = %e, "skipping query");
                    summary.malformed += 1;
                    continue;
                }
            };

            let duration = match QueryDuration::from_stats(&info.query_stats) {
                Ok(duration) => duration,
                Err(e) => {
                    warn!(poller = "query", query_id = %info.query_id, error = %e, "skipping query");
                    summary.malformed += 1;
                    continue;
                }
            };

            // records without an ID cannot be tracked and are always counted
            if self.dedup == DedupStrategy::SeenIds
                && !info.query_id.is_empty()
                && !self.seen.insert(&info.query_id, end)
            {
                summary.duplicate += 1;
                continue;
            }

            self.recorder
                .observe(metrics::QUERY_ELAPSED_SECONDS, duration.elapsed.as_secs_f64());
            self.recorder.observe(
                metrics::QUERY_EXECUTION_SECONDS,
                duration.execution.as_secs_f64(),
            );
            summary.observed += 1;
        }

        summary
    }
}

#[async_trait]
impl Poller for QueryPoller {
    fn name(&self) -> &'static str {
        "query"
    }

    async fn poll_once(&mut self) -> Result<(), AdapterError> {
        let records = self.source.queries().await?;
        let summary = self.process_batch(&records, Utc::now());
        debug!(
            records = records.len(),
            observed = summary.observed,
            running = summary.running,
            outside_window = summary.outside_window,
            malformed = summary.malformed,
            duplicate = summary.duplicate,
            seen = self.seen_len(),
            "query batch"
        );
        Ok(())
    }
}

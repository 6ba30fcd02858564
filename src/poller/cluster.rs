use std::sync::Arc;

use async_trait::async_trait;
use prestowatch_adapters::{AdapterError, ClusterStats, StatsSource};
use prestowatch_sdk::Recorder;
use tracing::debug;

use super::Poller;
use crate::metrics;

/// Mirrors `/v1/cluster` into gauges.
pub struct ClusterPoller {
    source: Arc<dyn StatsSource>,
    recorder: Arc<dyn Recorder>,
}

impl ClusterPoller {
    pub fn new(source: Arc<dyn StatsSource>, recorder: Arc<dyn Recorder>) -> Self {
        Self { source, recorder }
    }

    /// Write one decoded response. Optional fields the coordinator did not
    /// send leave their gauges as they were.
    pub fn record(&self, stats: &ClusterStats) {
        self.recorder
            .set_gauge(metrics::RUNNING_QUERIES, stats.running_queries);
        self.recorder
            .set_gauge(metrics::ACTIVE_WORKERS, stats.active_workers);

        if let Some(queued) = stats.queued_queries {
            self.recorder.set_gauge(metrics::QUEUED_QUERIES, queued);
        }
        if let Some(blocked) = stats.blocked_queries {
            self.recorder.set_gauge(metrics::BLOCKED_QUERIES, blocked);
        }
    }
}

#[async_trait]
impl Poller for ClusterPoller {
    fn name(&self) -> &'static str {
        "cluster"
    }

    async fn poll_once(&mut self) -> Result<(), AdapterError> {
        let stats = self.source.cluster_stats().await?;
        debug!(
            running_queries = stats.running_queries,
            active_workers = stats.active_workers,
            "cluster stats"
        );
        self.record(&stats);
        Ok(())
    }
}

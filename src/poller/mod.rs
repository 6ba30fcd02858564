//! Poll loops that turn coordinator status into metrics.
//!
//! Each poller owns one endpoint and runs on its own schedule. A failed
//! cycle is logged and retried; it never stops the loop and never touches
//! metrics, so the last good values stay visible.

mod cluster;
mod dedup;
mod query;
mod window;

use std::time::Duration;

use async_trait::async_trait;
use prestowatch_adapters::AdapterError;
use prestowatch_types::format_duration;
use tracing::{error, info};

use crate::backoff::{Backoff, BackoffPolicy};

pub use cluster::ClusterPoller;
pub use dedup::{DedupStrategy, SeenQueries};
pub use query::{BatchSummary, QueryDuration, QueryPoller};
pub use window::{classify, Completion, ObservationWindow};

/// One unit of polling work, run repeatedly by [`run_poll_loop`].
#[async_trait]
pub trait Poller: Send {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    /// Fetch once and record the result.
    async fn poll_once(&mut self) -> Result<(), AdapterError>;
}

/// Run `poller` forever, one cycle every `interval`.
///
/// The first cycle runs immediately. After a failure the next attempt waits
/// according to `policy`. Returns only on an error that retrying cannot fix.
pub async fn run_poll_loop<P: Poller>(
    mut poller: P,
    interval: Duration,
    policy: BackoffPolicy,
) -> AdapterError {
    let mut backoff = Backoff::new(policy);

    loop {
        match poller.poll_once().await {
            Ok(()) => {
                if backoff.failures() > 0 {
                    info!(
                        poller = poller.name(),
                        failures = backoff.failures(),
                        "poll recovered"
                    );
                }
                backoff.reset();
                tokio::time::sleep(interval).await;
            }
            Err(e) if e.is_fatal() => {
                error!(poller = poller.name(), error = %e, "poller stopping");
                return e;
            }
            Err(e) => {
                let retry_in = backoff.next_delay().unwrap_or(interval);
                error!(
                    poller = poller.name(),
                    error = %e,
                    failures = backoff.failures(),
                    retry_in = %format_duration(retry_in),
                    "poll failed"
                );
                tokio::time::sleep(retry_in).await;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use prestowatch_adapters::ClusterStats;

    struct Failing {
        attempts: usize,
        error: fn() -> AdapterError,
    }

    #[async_trait]
    impl Poller for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn poll_once(&mut self) -> Result<(), AdapterError> {
            self.attempts += 1;
            Err((self.error)())
        }
    }

    #[tokio::test]
    async fn fatal_error_ends_loop() {
        let poller = Failing {
            attempts: 0,
            error: || AdapterError::InvalidUrl {
                url: "x".into(),
                reason: "bad".into(),
            },
        };

        let err = run_poll_loop(poller, Duration::from_secs(1), BackoffPolicy::disabled()).await;
        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_keep_loop_alive_and_metrics_untouched() {
        let source = shared(ScriptedSource::default());
        let recorder = shared(MockRecorder::default());
        source.push_cluster(Ok(ClusterStats {
            running_queries: 3.0,
            active_workers: 7.0,
            queued_queries: None,
            blocked_queries: None,
        }));
        // every later call fails with "script exhausted"

        let poller = ClusterPoller::new(source.clone(), recorder.clone());
        let handle = tokio::spawn(run_poll_loop(
            poller,
            Duration::from_secs(10),
            BackoffPolicy::exponential(Duration::from_secs(1), Duration::from_secs(10)),
        ));

        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(!handle.is_finished());
        assert!(source.calls() > 2, "only {} calls", source.calls());
        assert_eq!(recorder.gauge("running_queries"), Some(3.0));
        assert_eq!(recorder.gauge("active_workers"), Some(7.0));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_backoff_retries_at_interval() {
        let source = shared(ScriptedSource::default());
        let recorder = shared(MockRecorder::default());

        let poller = ClusterPoller::new(source.clone(), recorder.clone());
        let handle = tokio::spawn(run_poll_loop(
            poller,
            Duration::from_secs(10),
            BackoffPolicy::disabled(),
        ));

        // attempts at t=0, 10, 20, 30
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(source.calls(), 4);
        assert_eq!(recorder.gauge("running_queries"), None);

        handle.abort();
    }
}

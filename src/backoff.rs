//! Retry delays after failed polls.
//!
//! After a failure the next attempt waits `initial`, then twice that, and so
//! on up to `max`, with jitter so several exporters pointed at one degraded
//! coordinator do not retry in lockstep. A success resets the sequence.

use std::time::Duration;

use rand::Rng;

/// How a poll loop waits after consecutive failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// When false, failures wait the normal poll interval.
    pub enabled: bool,
    /// Delay ceiling after the first failure.
    pub initial: Duration,
    /// Largest delay ever returned.
    pub max: Duration,
    /// Growth factor between consecutive failures.
    pub multiplier: f64,
}

impl BackoffPolicy {
    /// Exponential backoff from `initial` up to `max`, doubling each time.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            enabled: true,
            initial: initial.min(max),
            max,
            multiplier: 2.0,
        }
    }

    /// No backoff: the caller falls back to its fixed interval.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            initial: Duration::ZERO,
            max: Duration::ZERO,
            multiplier: 1.0,
        }
    }
}

/// Backoff state for one poll loop.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    failures: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Number of failures since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Forget past failures after a successful poll.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Un-jittered delay for the failure about to be recorded.
    pub fn ceiling(&self) -> Duration {
        let exponent = self.failures.min(32) as i32;
        let secs = self.policy.initial.as_secs_f64() * self.policy.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.policy.max.as_secs_f64() {
            self.policy.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Record a failure and return how long to wait before retrying.
    ///
    /// Returns `None` when backoff is disabled. Otherwise the delay lies in
    /// `[ceiling / 2, ceiling]`, so it never collapses to zero.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.policy.enabled {
            self.failures = self.failures.saturating_add(1);
            return None;
        }

        let ceiling = self.ceiling();
        self.failures = self.failures.saturating_add(1);

        let half = ceiling / 2;
        let spread = (ceiling - half).as_nanos() as u64;
        let jitter = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=spread)
        };
        Some(half + Duration::from_nanos(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_doubles_up_to_max() {
        let mut backoff = Backoff::new(BackoffPolicy::exponential(
            Duration::from_secs(1),
            Duration::from_secs(10),
        ));

        let mut ceilings = Vec::new();
        for _ in 0..6 {
            ceilings.push(backoff.ceiling());
            backoff.next_delay();
        }

        assert_eq!(
            ceilings,
            [1, 2, 4, 8, 10, 10].map(Duration::from_secs).to_vec()
        );
    }

    #[test]
    fn delay_stays_within_jitter_bounds() {
        let mut backoff = Backoff::new(BackoffPolicy::exponential(
            Duration::from_secs(4),
            Duration::from_secs(60),
        ));

        for _ in 0..20 {
            let ceiling = backoff.ceiling();
            let delay = backoff.next_delay().unwrap();
            assert!(delay >= ceiling / 2, "{:?} < {:?}", delay, ceiling / 2);
            assert!(delay <= ceiling, "{:?} > {:?}", delay, ceiling);
        }
        assert_eq!(backoff.failures(), 20);
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = Backoff::new(BackoffPolicy::exponential(
            Duration::from_secs(1),
            Duration::from_secs(60),
        ));
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.ceiling(), Duration::from_secs(4));

        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.ceiling(), Duration::from_secs(1));
    }

    #[test]
    fn disabled_policy_defers_to_caller() {
        let mut backoff = Backoff::new(BackoffPolicy::disabled());
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.failures(), 1);
    }

    #[test]
    fn initial_is_clamped_to_max() {
        let policy = BackoffPolicy::exponential(Duration::from_secs(30), Duration::from_secs(5));
        assert_eq!(policy.initial, Duration::from_secs(5));
    }

    #[test]
    fn many_failures_do_not_overflow() {
        let mut backoff = Backoff::new(BackoffPolicy::exponential(
            Duration::from_secs(1),
            Duration::from_secs(60),
        ));
        for _ in 0..200 {
            backoff.next_delay();
        }
        assert_eq!(backoff.ceiling(), Duration::from_secs(60));
    }
}

//! The recording capability handed to pollers.

use std::sync::Arc;

use prometheus::DEFAULT_BUCKETS;
use tracing::{debug, warn};

use crate::state::Registry;

/// A sink for metric updates.
///
/// Pollers only ever see this trait, so tests can swap the process registry
/// for a fresh one or a mock. Implementations must be safe to call from
/// several poll loops at once without external locking.
pub trait Recorder: Send + Sync {
    /// Overwrite a gauge. The last value written wins.
    fn set_gauge(&self, name: &str, value: f64);

    /// Append one observation to a histogram.
    fn observe(&self, name: &str, value: f64);
}

/// Writes never fail: a name the registry refuses is logged and the write dropped.
impl Recorder for Registry {
    fn set_gauge(&self, name: &str, value: f64) {
        match self.register_gauge(name, "") {
            Ok(gauge) => gauge.set(value),
            Err(e) => warn!(gauge = name, error = %e, "dropping gauge update"),
        }
    }

    fn observe(&self, name: &str, value: f64) {
        if value.is_nan() {
            debug!(histogram = name, "ignoring NaN observation");
            return;
        }
        match self.register_histogram(name, "", DEFAULT_BUCKETS) {
            Ok(histogram) => histogram.observe(value),
            Err(e) => warn!(histogram = name, error = %e, "dropping observation"),
        }
    }
}

impl<R: Recorder + ?Sized> Recorder for Arc<R> {
    fn set_gauge(&self, name: &str, value: f64) {
        (**self).set_gauge(name, value);
    }

    fn observe(&self, name: &str, value: f64) {
        (**self).observe(name, value);
    }
}

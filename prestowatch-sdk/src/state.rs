//! Process-wide metric state, backed by a `prometheus` registry.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;
use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, Opts, TextEncoder};
use thiserror::Error;

/// The kind a metric name was first registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Histogram,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => f.write_str("gauge"),
            MetricKind::Histogram => f.write_str("histogram"),
        }
    }
}

/// Errors registering or rendering metrics.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The name is taken by a metric of another kind.
    #[error("{name} is already registered as a {registered}")]
    KindMismatch {
        name: String,
        registered: MetricKind,
    },

    /// Rejected by the underlying registry (invalid name or buckets).
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),

    #[error("exposition is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Clone)]
enum Metric {
    Gauge(Gauge),
    Histogram(Histogram),
}

impl Metric {
    fn kind(&self) -> MetricKind {
        match self {
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Histogram(_) => MetricKind::Histogram,
        }
    }

    fn gauge(&self, name: &str) -> Result<Gauge, RegistryError> {
        match self {
            Metric::Gauge(gauge) => Ok(gauge.clone()),
            other => Err(mismatch(name, other.kind())),
        }
    }

    fn histogram(&self, name: &str) -> Result<Histogram, RegistryError> {
        match self {
            Metric::Histogram(histogram) => Ok(histogram.clone()),
            other => Err(mismatch(name, other.kind())),
        }
    }
}

fn mismatch(name: &str, registered: MetricKind) -> RegistryError {
    RegistryError::KindMismatch {
        name: name.to_string(),
        registered,
    }
}

/// Every gauge and histogram the process publishes.
///
/// Metrics are created on first registration and live for the process
/// lifetime. Registering an existing name of the same kind returns a handle
/// to the same metric; a name belongs to exactly one kind.
pub struct Registry {
    inner: prometheus::Registry,
    namespace: String,
    metrics: RwLock<BTreeMap<String, Metric>>,
    descriptions: RwLock<BTreeMap<String, String>>,
}

impl Registry {
    /// An empty registry whose metric names are rendered as-is.
    pub fn new() -> Self {
        Self::with_namespace("")
    }

    /// An empty registry that publishes every name as `<namespace>_<name>`.
    ///
    /// The prefixed name is validated when each metric is registered.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            inner: prometheus::Registry::new(),
            namespace: namespace.into(),
            metrics: RwLock::new(BTreeMap::new()),
            descriptions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Record help text for a metric that is only created later, on first write.
    pub fn describe(&self, name: &str, help: &str) {
        self.descriptions
            .write()
            .insert(name.to_string(), help.to_string());
    }

    /// Get or create a gauge.
    pub fn register_gauge(&self, name: &str, help: &str) -> Result<Gauge, RegistryError> {
        if let Some(metric) = self.metrics.read().get(name) {
            return metric.gauge(name);
        }

        let mut metrics = self.metrics.write();
        if let Some(metric) = metrics.get(name) {
            return metric.gauge(name);
        }

        let opts = Opts::new(name, self.help_for(name, help)).namespace(self.namespace.as_str());
        let gauge = Gauge::with_opts(opts)?;
        self.inner.register(Box::new(gauge.clone()))?;
        metrics.insert(name.to_string(), Metric::Gauge(gauge.clone()));
        Ok(gauge)
    }

    /// Get or create a histogram.
    ///
    /// `buckets` are upper bounds; they are sorted and deduplicated, and
    /// non-finite bounds dropped. An existing histogram keeps its buckets.
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        buckets: &[f64],
    ) -> Result<Histogram, RegistryError> {
        if let Some(metric) = self.metrics.read().get(name) {
            return metric.histogram(name);
        }

        let mut metrics = self.metrics.write();
        if let Some(metric) = metrics.get(name) {
            return metric.histogram(name);
        }

        let opts = HistogramOpts::new(name, self.help_for(name, help))
            .namespace(self.namespace.as_str())
            .buckets(bounds(buckets));
        let histogram = Histogram::with_opts(opts)?;
        self.inner.register(Box::new(histogram.clone()))?;
        metrics.insert(name.to_string(), Metric::Histogram(histogram.clone()));
        Ok(histogram)
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, RegistryError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.inner.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    // Help text must be non-empty for the text format.
    fn help_for(&self, name: &str, help: &str) -> String {
        if !help.is_empty() {
            return help.to_string();
        }
        self.descriptions
            .read()
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics = self.metrics.read();
        f.debug_struct("Registry")
            .field("namespace", &self.namespace)
            .field("metrics", &metrics.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn bounds(buckets: &[f64]) -> Vec<f64> {
    let mut bounds: Vec<f64> = buckets.iter().copied().filter(|b| b.is_finite()).collect();
    bounds.sort_by(f64::total_cmp);
    bounds.dedup();
    bounds
}

//! Layered configuration.
//!
//! Built-in defaults, then an optional TOML file, then `PRESTOWATCH_*`
//! environment variables, then command-line flags. Later layers win.
//!
//! ```toml
//! presto_url = "http://presto-coordinator:8080"
//! port = 9988
//! query_interval = "60s"
//! dedup = "seen-ids"
//!
//! [backoff]
//! initial = "2s"
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `PRESTOWATCH_BACKOFF__ENABLED=false`.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use prestowatch_types::parse_duration;
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::backoff::BackoffPolicy;
use crate::cli::Args;
use crate::poller::DedupStrategy;

const ENV_PREFIX: &str = "PRESTOWATCH";

/// Errors that stop the exporter before it starts polling.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("presto_url is required (--presto-http-url or PRESTOWATCH_PRESTO_URL)")]
    MissingUrl,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid log level {0:?} (expected trace, debug, info, warn, error or off)")]
    LogLevel(String),
}

/// Everything that can be configured, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub presto_url: Option<String>,
    pub presto_user: Option<String>,
    pub port: u16,
    pub listen_host: String,
    pub metrics_path: String,
    pub namespace: Option<String>,
    pub log_level: String,

    #[serde(deserialize_with = "duration")]
    pub request_timeout: Duration,
    #[serde(deserialize_with = "duration")]
    pub cluster_interval: Duration,
    #[serde(deserialize_with = "duration")]
    pub query_interval: Duration,
    #[serde(deserialize_with = "optional_duration")]
    pub query_window: Option<Duration>,

    pub dedup: DedupStrategy,
    pub backoff: BackoffSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            presto_url: None,
            presto_user: None,
            port: 9988,
            listen_host: "0.0.0.0".to_string(),
            metrics_path: "/metrics".to_string(),
            namespace: None,
            log_level: "info".to_string(),
            request_timeout: Duration::from_secs(5),
            cluster_interval: Duration::from_secs(10),
            query_interval: Duration::from_secs(60),
            query_window: None,
            dedup: DedupStrategy::default(),
            backoff: BackoffSettings::default(),
        }
    }
}

/// The `[backoff]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    pub enabled: bool,
    #[serde(deserialize_with = "duration")]
    pub initial: Duration,
    /// Defaults to each poller's own interval.
    #[serde(deserialize_with = "optional_duration")]
    pub max: Option<Duration>,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            initial: Duration::from_secs(1),
            max: None,
        }
    }
}

impl BackoffSettings {
    fn policy(&self, interval: Duration) -> BackoffPolicy {
        if self.enabled {
            BackoffPolicy::exponential(self.initial, self.max.unwrap_or(interval))
        } else {
            BackoffPolicy::disabled()
        }
    }
}

impl Settings {
    /// Load defaults, the optional file at `path`, and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let config = builder
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Apply command-line overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(url) = &args.presto_url {
            self.presto_url = Some(url.clone());
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if let Some(interval) = args.cluster_interval {
            self.cluster_interval = interval;
        }
        if let Some(interval) = args.query_interval {
            self.query_interval = interval;
        }
        if let Some(window) = args.query_window {
            self.query_window = Some(window);
        }
        if let Some(dedup) = args.dedup {
            self.dedup = dedup;
        }
    }

    /// Check the settings and resolve defaults that depend on other fields.
    pub fn validate(self) -> Result<ExporterConfig, ConfigError> {
        let log_level = parse_log_level(&self.log_level)?;
        let presto_url = self
            .presto_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingUrl)?;

        for (field, value) in [
            ("cluster_interval", self.cluster_interval),
            ("query_interval", self.query_interval),
            ("request_timeout", self.request_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Zero { field });
            }
        }
        if self.query_window.is_some_and(|w| w.is_zero()) {
            return Err(ConfigError::Zero {
                field: "query_window",
            });
        }
        if self.backoff.enabled && self.backoff.initial.is_zero() {
            return Err(ConfigError::Zero {
                field: "backoff.initial",
            });
        }

        Ok(ExporterConfig {
            presto_url,
            presto_user: self.presto_user,
            request_timeout: self.request_timeout,
            listen_addr: listen_addr(&self.listen_host, self.port),
            metrics_path: self.metrics_path,
            namespace: self.namespace,
            cluster_interval: self.cluster_interval,
            query_interval: self.query_interval,
            query_window: self.query_window.unwrap_or(self.query_interval),
            dedup: self.dedup,
            cluster_backoff: self.backoff.policy(self.cluster_interval),
            query_backoff: self.backoff.policy(self.query_interval),
            log_level,
        })
    }
}

/// Validated configuration the exporter runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    pub presto_url: String,
    pub presto_user: Option<String>,
    pub request_timeout: Duration,
    pub listen_addr: String,
    pub metrics_path: String,
    pub namespace: Option<String>,
    pub cluster_interval: Duration,
    pub query_interval: Duration,
    pub query_window: Duration,
    pub dedup: DedupStrategy,
    pub cluster_backoff: BackoffPolicy,
    pub query_backoff: BackoffPolicy,
    pub log_level: LevelFilter,
}

impl ExporterConfig {
    /// Settings that are valid but likely to skew the query histograms.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.query_window < self.query_interval {
            warnings.push(format!(
                "query_window ({:?}) is shorter than query_interval ({:?}); queries finishing between polls will be missed",
                self.query_window, self.query_interval
            ));
        }
        if self.query_window > self.query_interval && self.dedup == DedupStrategy::Window {
            warnings.push(format!(
                "query_window ({:?}) is longer than query_interval ({:?}); queries may be counted more than once, consider dedup = \"seen-ids\"",
                self.query_window, self.query_interval
            ));
        }

        warnings
    }
}

/// Parse a single level name. `warning`, `fatal` and `panic` are accepted as
/// aliases so existing deployment flags keep working.
pub fn parse_log_level(level: &str) -> Result<LevelFilter, ConfigError> {
    let normalized = level.trim().to_ascii_lowercase();
    let name = match normalized.as_str() {
        "" => return Err(ConfigError::LogLevel(level.to_string())),
        "warning" => "warn",
        "fatal" | "panic" => "error",
        other => other,
    };
    LevelFilter::from_str(name).map_err(|_| ConfigError::LogLevel(level.to_string()))
}

fn listen_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

// Durations may be written as strings ("10s") or as whole seconds.
#[derive(Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Secs(u64),
    Text(String),
}

impl DurationValue {
    fn into_duration<E: de::Error>(self) -> Result<Duration, E> {
        match self {
            DurationValue::Secs(secs) => Ok(Duration::from_secs(secs)),
            DurationValue::Text(text) => parse_duration(&text).map_err(E::custom),
        }
    }
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    DurationValue::deserialize(deserializer)?.into_duration()
}

fn optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<DurationValue>::deserialize(deserializer)?
        .map(DurationValue::into_duration)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(Default::default()))
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(vars))
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_sources() {
        let settings = Settings::load_with_env(None, no_env()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 9988);
        assert_eq!(settings.cluster_interval, Duration::from_secs(10));
        assert_eq!(settings.query_interval, Duration::from_secs(60));
    }

    #[test]
    fn file_overrides_defaults() {
        let file = toml_file(
            r#"
            presto_url = "http://presto:8080"
            port = 9100
            query_interval = "2m"
            query_window = 150
            dedup = "seen-ids"

            [backoff]
            initial = "500ms"
            max = "30s"
            "#,
        );

        let settings = Settings::load_with_env(Some(file.path()), no_env()).unwrap();

        assert_eq!(settings.presto_url.as_deref(), Some("http://presto:8080"));
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.query_interval, Duration::from_secs(120));
        assert_eq!(settings.query_window, Some(Duration::from_secs(150)));
        assert_eq!(settings.dedup, DedupStrategy::SeenIds);
        assert_eq!(settings.backoff.initial, Duration::from_millis(500));
        assert_eq!(settings.backoff.max, Some(Duration::from_secs(30)));
        assert!(settings.backoff.enabled);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn environment_overrides_file() {
        let file = toml_file("presto_url = \"http://from-file:8080\"\nport = 9100\n");
        let env = env(&[
            ("PRESTOWATCH_PRESTO_URL", "http://from-env:8080"),
            ("PRESTOWATCH_CLUSTER_INTERVAL", "30s"),
            ("PRESTOWATCH_BACKOFF__ENABLED", "false"),
        ]);

        let settings = Settings::load_with_env(Some(file.path()), env).unwrap();

        assert_eq!(settings.presto_url.as_deref(), Some("http://from-env:8080"));
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.cluster_interval, Duration::from_secs(30));
        assert!(!settings.backoff.enabled);
    }

    #[test]
    fn args_override_everything() {
        let env = env(&[("PRESTOWATCH_PORT", "9100")]);
        let mut settings = Settings::load_with_env(None, env).unwrap();

        settings.apply_args(&Args {
            presto_url: Some("http://from-cli:8080".to_string()),
            port: Some(9200),
            dedup: Some(DedupStrategy::SeenIds),
            ..Args::default()
        });

        assert_eq!(settings.presto_url.as_deref(), Some("http://from-cli:8080"));
        assert_eq!(settings.port, 9200);
        assert_eq!(settings.dedup, DedupStrategy::SeenIds);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Settings::load_with_env(Some(Path::new("/nonexistent/prestowatch.toml")), no_env())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn bad_duration_is_an_error() {
        let file = toml_file("query_interval = \"soon\"\n");
        assert!(Settings::load_with_env(Some(file.path()), no_env()).is_err());
    }

    #[test]
    fn validate_requires_url() {
        let err = Settings::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingUrl));

        let settings = Settings {
            presto_url: Some("  ".to_string()),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::MissingUrl)));
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let settings = Settings {
            presto_url: Some("http://presto:8080".to_string()),
            query_interval: Duration::ZERO,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Zero {
                field: "query_interval"
            })
        ));
    }

    #[test]
    fn validate_resolves_defaults() {
        let config = Settings {
            presto_url: Some("http://presto:8080".to_string()),
            ..Settings::default()
        }
        .validate()
        .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:9988");
        assert_eq!(config.query_window, Duration::from_secs(60));
        assert_eq!(
            config.cluster_backoff,
            BackoffPolicy::exponential(Duration::from_secs(1), Duration::from_secs(10))
        );
        assert_eq!(
            config.query_backoff,
            BackoffPolicy::exponential(Duration::from_secs(1), Duration::from_secs(60))
        );
        assert!(config.warnings().is_empty());
        assert_eq!(config.log_level, LevelFilter::INFO);
    }

    #[test]
    fn log_level_accepts_names_and_aliases() {
        assert_eq!(parse_log_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_log_level("WARN").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_log_level("warning").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_log_level("fatal").unwrap(), LevelFilter::ERROR);
        assert_eq!(parse_log_level("panic").unwrap(), LevelFilter::ERROR);
        assert_eq!(parse_log_level("off").unwrap(), LevelFilter::OFF);
    }

    #[test]
    fn log_level_rejects_unknown_names() {
        for level in ["bogus", "", "prestowatch=debug"] {
            assert!(
                matches!(parse_log_level(level), Err(ConfigError::LogLevel(_))),
                "{:?} was accepted",
                level
            );
        }

        let settings = Settings {
            presto_url: Some("http://presto:8080".to_string()),
            log_level: "verbose".to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::LogLevel(_))));
    }

    #[test]
    fn disabled_backoff_policy() {
        let mut settings = Settings {
            presto_url: Some("http://presto:8080".to_string()),
            ..Settings::default()
        };
        settings.backoff.enabled = false;

        let config = settings.validate().unwrap();
        assert_eq!(config.cluster_backoff, BackoffPolicy::disabled());
    }

    #[test]
    fn ipv6_listen_host_is_bracketed() {
        assert_eq!(listen_addr("::", 9988), "[::]:9988");
        assert_eq!(listen_addr("[::1]", 9988), "[::1]:9988");
        assert_eq!(listen_addr("127.0.0.1", 80), "127.0.0.1:80");
    }

    #[test]
    fn window_interval_mismatch_warns() {
        let base = Settings {
            presto_url: Some("http://presto:8080".to_string()),
            ..Settings::default()
        };

        let short = Settings {
            query_window: Some(Duration::from_secs(30)),
            ..base.clone()
        };
        let warnings = short.validate().unwrap().warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("missed"));

        let long = Settings {
            query_window: Some(Duration::from_secs(120)),
            ..base.clone()
        };
        let warnings = long.validate().unwrap().warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("more than once"));

        let long_deduped = Settings {
            query_window: Some(Duration::from_secs(120)),
            dedup: DedupStrategy::SeenIds,
            ..base
        };
        assert!(long_deduped.validate().unwrap().warnings().is_empty());
    }
}

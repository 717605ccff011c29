//! Configuration
//!
//! Every field has a default. Values are layered: defaults, then an optional
//! JSON file (`SONAR_CONFIG`), then individual `SONAR_*` environment
//! variables. Durations are written as (fractional) seconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::MAX_MESSAGE_BYTES;
use crate::server::broadcaster::DEFAULT_CAPACITY;
use crate::types::{McpError, McpResult};

/// Environment variable naming a JSON config file
pub const CONFIG_PATH_ENV: &str = "SONAR_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub selection: SelectionConfig,
    /// Default tracing level when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            client: ClientConfig::default(),
            selection: SelectionConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Protocol server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Longest accepted request line, line terminator excluded
    pub max_message_bytes: usize,
    /// Idle time after which a connection's read is re-polled
    #[serde(with = "secs")]
    pub read_timeout: Duration,
    /// How long shutdown waits for open connections
    #[serde(with = "secs")]
    pub shutdown_grace: Duration,
    /// Notifications buffered per connection before it lags
    pub notification_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            max_message_bytes: MAX_MESSAGE_BYTES,
            read_timeout: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(5),
            notification_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Protocol client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    #[serde(with = "secs")]
    pub response_timeout: Duration,
    /// Longest accepted response line, line terminator excluded
    pub max_message_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(30),
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

/// Selection engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub semantic_weight: f64,
    pub network_weight: f64,
    pub diversity_weight: f64,
    /// Candidates kept after semantic narrowing
    pub top_k_candidates: usize,
    /// Similarity below which semantic matches are dropped
    pub min_similarity_threshold: f64,
    /// Selection records retained
    pub history_capacity: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.5,
            network_weight: 0.3,
            diversity_weight: 0.1,
            top_k_candidates: 5,
            min_similarity_threshold: 0.1,
            history_capacity: 1000,
        }
    }
}

impl Config {
    /// Load a JSON config file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> McpResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| McpError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Parsed configuration file {}", path.display());
        Ok(config)
    }

    /// File named by `SONAR_CONFIG`, if set
    pub fn path_from_env() -> Option<PathBuf> {
        std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
    }

    /// Defaults, then `SONAR_CONFIG` if set, then `SONAR_*` overrides.
    pub fn from_env() -> McpResult<Self> {
        let mut config = match Self::path_from_env() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// One-line summary for the startup log
    pub fn describe(&self, source: Option<&Path>) -> String {
        let origin = match source {
            Some(path) => format!("file {}", path.display()),
            None => "defaults".to_string(),
        };
        format!(
            "{} with env overrides: server {}, log level {}, weights {}/{}/{}, top_k {}",
            origin,
            self.server.address(),
            self.log_level,
            self.selection.semantic_weight,
            self.selection.network_weight,
            self.selection.diversity_weight,
            self.selection.top_k_candidates
        )
    }

    /// Override fields from `SONAR_*` environment variables
    pub fn apply_env(&mut self) -> McpResult<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Override fields from any key/value source
    pub fn apply_vars<F>(&mut self, lookup: F) -> McpResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SONAR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "SONAR_PORT")? {
            self.server.port = port;
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, "SONAR_MAX_MESSAGE_BYTES")? {
            self.server.max_message_bytes = max;
            self.client.max_message_bytes = max;
        }
        if let Some(timeout) = duration_var(&lookup, "SONAR_READ_TIMEOUT_SECS")? {
            self.server.read_timeout = timeout;
        }
        if let Some(timeout) = duration_var(&lookup, "SONAR_RESPONSE_TIMEOUT_SECS")? {
            self.client.response_timeout = timeout;
        }
        if let Some(w) = parse_var(&lookup, "SONAR_SEMANTIC_WEIGHT")? {
            self.selection.semantic_weight = w;
        }
        if let Some(w) = parse_var(&lookup, "SONAR_NETWORK_WEIGHT")? {
            self.selection.network_weight = w;
        }
        if let Some(w) = parse_var(&lookup, "SONAR_DIVERSITY_WEIGHT")? {
            self.selection.diversity_weight = w;
        }
        if let Some(k) = parse_var(&lookup, "SONAR_TOP_K")? {
            self.selection.top_k_candidates = k;
        }
        if let Some(s) = parse_var(&lookup, "SONAR_MIN_SIMILARITY")? {
            self.selection.min_similarity_threshold = s;
        }
        if let Some(level) = lookup("SONAR_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Reject values the server or selector cannot run with
    pub fn validate(&self) -> McpResult<()> {
        let fail = |msg: &str| -> McpResult<()> { Err(McpError::Config(msg.to_string())) };

        if self.server.host.trim().is_empty() {
            return fail("server.host must not be empty");
        }
        if self.server.max_message_bytes == 0 || self.client.max_message_bytes == 0 {
            return fail("max_message_bytes must be positive");
        }
        if self.server.read_timeout.is_zero()
            || self.client.response_timeout.is_zero()
            || self.client.connect_timeout.is_zero()
        {
            return fail("timeouts must be positive");
        }
        if self.server.notification_capacity == 0 {
            return fail("server.notification_capacity must be positive");
        }

        let s = &self.selection;
        let weights = [s.semantic_weight, s.network_weight, s.diversity_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return fail("selection weights must be finite and non-negative");
        }
        if s.top_k_candidates == 0 {
            return fail("selection.top_k_candidates must be positive");
        }
        if s.history_capacity == 0 {
            return fail("selection.history_capacity must be positive");
        }
        if !s.min_similarity_threshold.is_finite() {
            return fail("selection.min_similarity_threshold must be finite");
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> McpResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| McpError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

fn duration_var<F>(lookup: &F, key: &str) -> McpResult<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<f64, _>(lookup, key)? {
        None => Ok(None),
        Some(seconds) => Duration::try_from_secs_f64(seconds)
            .map(Some)
            .map_err(|e| McpError::Config(format!("{}: {}", key, e))),
    }
}

/// Durations as fractional seconds
mod secs {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.address(), "127.0.0.1:8765");
        assert_eq!(config.server.max_message_bytes, 10 * 1024 * 1024);
        assert_eq!(config.server.read_timeout, Duration::from_secs(60));
        assert_eq!(config.client.response_timeout, Duration::from_secs(30));
        assert_eq!(config.selection.top_k_candidates, 5);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[
                ("SONAR_PORT", "9000"),
                ("SONAR_MAX_MESSAGE_BYTES", "2048"),
                ("SONAR_RESPONSE_TIMEOUT_SECS", "0.5"),
                ("SONAR_NETWORK_WEIGHT", "0"),
                ("SONAR_LOG_LEVEL", "debug"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.client.max_message_bytes, 2048);
        assert_eq!(config.client.response_timeout, Duration::from_millis(500));
        assert_eq!(config.selection.network_weight, 0.0);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        let mut config = Config::default();
        let err = config.apply_vars(vars(&[("SONAR_PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, McpError::Config(_)));
        assert!(err.to_string().contains("SONAR_PORT"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.selection.top_k_candidates = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.selection.semantic_weight = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.read_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 7000, "read_timeout": 1.5}}, "selection": {{"top_k_candidates": 3}}}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.read_timeout, Duration::from_millis(1500));
        assert_eq!(config.selection.top_k_candidates, 3);
        assert_eq!(config.selection.semantic_weight, 0.5);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(Config::from_file(file.path()), Err(McpError::Config(_))));
    }

    #[test]
    fn test_describe_names_source_and_settings() {
        let config = Config::default();
        let from_defaults = config.describe(None);
        assert!(from_defaults.starts_with("defaults"));
        assert!(from_defaults.contains("127.0.0.1:8765"));
        assert!(from_defaults.contains("log level info"));

        let from_file = config.describe(Some(Path::new("/etc/sonar.json")));
        assert!(from_file.starts_with("file /etc/sonar.json"));
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

//! YAML configuration for the replay server.
//!
//! One config file declares every dataset to replay: where its CSV lives,
//! how fast to emit, which sink variant it feeds, and the normalization
//! bounds for its numeric fields.

use crate::replaystream::emitter::{ClockMode, EmitterConfig, FailurePolicy, DEFAULT_INTERVAL_MS};
use crate::replaystream::normalize::{FieldSpec, NormalizeError, Normalizer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Which sink variant a dataset publishes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Server-Sent Events endpoint at `/{name}-stream`
    #[default]
    Sse,
    /// Kafka topic
    Kafka,
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file missing or unreadable
    Io(String),
    /// Config file is not valid YAML
    Parse(String),
    /// Config file parsed but fails validation
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config IO error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

/// Top-level replay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Address the SSE server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Kafka broker list shared by every kafka-sink dataset
    #[serde(default = "default_brokers")]
    pub brokers: String,

    /// Datasets to replay
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
}

/// Configuration of one replayed dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Short name; becomes the `/{name}-stream` route and shows up in logs
    pub name: String,

    /// Path to the CSV file
    pub path: String,

    /// Emission interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Timestamp derivation mode
    #[serde(default)]
    pub clock: ClockMode,

    /// Publish-failure handling
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Sink variant
    #[serde(default)]
    pub sink: SinkKind,

    /// Kafka topic; required when `sink` is `kafka`
    #[serde(default)]
    pub topic: Option<String>,

    /// Optional end-of-stream payload for the Kafka sink
    #[serde(default)]
    pub end_marker: Option<String>,

    /// Run records through the normalizer before publishing
    #[serde(default)]
    pub normalize: bool,

    /// Per-field normalization bounds and defaults
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl DatasetConfig {
    /// The emitter settings this dataset runs with.
    pub fn emitter_config(&self) -> EmitterConfig {
        EmitterConfig {
            interval: Duration::from_millis(self.interval_ms),
            clock: self.clock,
            failure_policy: self.failure_policy,
        }
    }

    /// Build the configured normalizer, if normalization is enabled.
    pub fn normalizer(&self) -> Result<Option<Normalizer>, NormalizeError> {
        if self.normalize {
            Normalizer::new(self.fields.clone()).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl ReplayConfig {
    /// Load and validate a YAML config file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate YAML config text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ReplayConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Look up a dataset by name.
    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for ds in &self.datasets {
            if ds.name.is_empty()
                || !ds
                    .name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
            {
                return Err(ConfigError::Invalid(format!(
                    "dataset name '{}' must be lowercase alphanumeric plus '-' or '_'",
                    ds.name
                )));
            }
            if !seen.insert(ds.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate dataset name '{}'",
                    ds.name
                )));
            }
            if ds.interval_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "dataset '{}': interval_ms must be positive",
                    ds.name
                )));
            }
            if ds.sink == SinkKind::Kafka && ds.topic.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Invalid(format!(
                    "dataset '{}' uses the kafka sink but has no topic",
                    ds.name
                )));
            }
            if ds.normalize {
                Normalizer::new(ds.fields.clone())
                    .map_err(|e| ConfigError::Invalid(format!("dataset '{}': {}", ds.name, e)))?;
            }
        }
        Ok(())
    }
}

//! Configuration models for `rpipe.toml`.
//!
//! This module defines the pipeline options that shape bucket keys and the
//! state chain, plus the settings used to reach the backing store.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Name of the first state in every chain unless overridden.
pub const DEFAULT_COLLECTOR_NAME: &str = "collector";

/// Separator placed between key segments unless overridden.
pub const DEFAULT_SEPARATOR: char = ':';

/// Options describing one aggregation group.
///
/// The effective state chain is always `[collector_name, ...states]`.
///
/// # Example
///
/// ```toml
/// [pipeline]
/// name = "orders"
/// prefix = "pipe"
/// states = ["processing", "done", "failed"]
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Aggregation group name, embedded in every key.
    pub name: String,

    /// Optional leading key segment.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Optional trailing key segment.
    #[serde(default)]
    pub postfix: Option<String>,

    /// Character placed between key segments.
    #[serde(default = "default_separator")]
    pub separator: char,

    /// Ordered states following the collector.
    #[serde(default)]
    pub states: Vec<String>,

    /// Name of the state newly registered messages land in.
    #[serde(default = "default_collector_name")]
    pub collector_name: String,
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

fn default_collector_name() -> String {
    DEFAULT_COLLECTOR_NAME.to_string()
}

impl PipelineConfig {
    /// Create a config with no prefix, no postfix and an empty state list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            postfix: None,
            separator: DEFAULT_SEPARATOR,
            states: Vec::new(),
            collector_name: default_collector_name(),
        }
    }

    /// Set the leading key segment.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the trailing key segment.
    pub fn with_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = Some(postfix.into());
        self
    }

    /// Set the states that follow the collector.
    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = states.into_iter().map(Into::into).collect();
        self
    }

    /// Override the collector state name.
    pub fn with_collector_name(mut self, collector_name: impl Into<String>) -> Self {
        self.collector_name = collector_name.into();
        self
    }

    /// Override the key separator.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }
}

/// Connection settings for the Redis store.
///
/// When `url` is set it wins over the individual fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub password: Option<String>,

    /// Logical database index.
    #[serde(default)]
    pub db: Option<i64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6379
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: default_host(),
            port: default_port(),
            password: None,
            db: None,
        }
    }
}

/// Root of `rpipe.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RpipeConfig {
    #[serde(default)]
    pub redis: RedisSettings,

    pub pipeline: PipelineConfig,
}

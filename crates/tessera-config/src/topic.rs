//! Topic and broker configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a topic reacts when a handler fails or a sender is rejected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStrategy {
    /// Surface the failure to the publisher and stop dispatching
    #[default]
    Raise,
    /// Log a warning and keep dispatching
    Warn,
    /// Record the failure and keep dispatching
    Ignore,
    /// Hand the failure to the topic's custom error handler
    Custom,
}

impl ErrorStrategy {
    /// Parse a strategy from its lower-case name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raise" => Some(Self::Raise),
            "warn" => Some(Self::Warn),
            "ignore" => Some(Self::Ignore),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Lower-case name of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raise => "raise",
            Self::Warn => "warn",
            Self::Ignore => "ignore",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ErrorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_max_dead_letters() -> usize {
    100
}

/// Declarative description of a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Topic identifier, unique within a broker
    pub id: String,

    /// Semantic version of the topic interface
    #[serde(default = "default_version")]
    pub version: String,

    /// Failure policy
    #[serde(default)]
    pub error_strategy: ErrorStrategy,

    /// Senders that may never publish
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// When present, the only senders that may publish
    #[serde(default)]
    pub whitelist: Option<Vec<String>>,

    /// Capacity of the dead-letter queue
    #[serde(default = "default_max_dead_letters")]
    pub max_dead_letters: usize,

    /// Promote topic activity logs from trace to debug
    #[serde(default)]
    pub debug: bool,
}

impl TopicConfig {
    /// Create a config with defaults for everything but the id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: default_version(),
            error_strategy: ErrorStrategy::default(),
            blacklist: Vec::new(),
            whitelist: None,
            max_dead_letters: default_max_dead_letters(),
            debug: false,
        }
    }

    /// Set the version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the error strategy
    pub fn with_error_strategy(mut self, strategy: ErrorStrategy) -> Self {
        self.error_strategy = strategy;
        self
    }

    /// Set the blacklist
    pub fn with_blacklist<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = senders.into_iter().map(Into::into).collect();
        self
    }

    /// Set the whitelist
    pub fn with_whitelist<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = Some(senders.into_iter().map(Into::into).collect());
        self
    }

    /// Set the dead-letter capacity
    pub fn with_max_dead_letters(mut self, max: usize) -> Self {
        self.max_dead_letters = max;
        self
    }

    /// Enable or disable debug logging
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// `id@version`
    pub fn full_id(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }
}

fn default_broker_name() -> String {
    "broker".to_string()
}

/// Broker configuration with the topics it owns from the start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker name, used in logs
    #[serde(default = "default_broker_name")]
    pub name: String,

    /// Promote broker activity logs from trace to debug
    #[serde(default)]
    pub debug: bool,

    /// Topics to create when the broker is built
    #[serde(default)]
    pub topics: Vec<TopicConfig>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            name: default_broker_name(),
            debug: false,
            topics: Vec::new(),
        }
    }
}

//! Logging configuration and subscriber installation
//!
//! Every Tessera crate logs through `tracing`. Applications call
//! [`init_logging`] once at startup; later calls are no-ops.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Static initialization guard
static INIT: Once = Once::new();

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level for all targets
    #[serde(default = "default_level")]
    pub level: String,

    /// Per-target overrides, e.g. `tessera_events = "debug"`
    #[serde(default)]
    pub targets: BTreeMap<String, String>,

    /// Whether to use ANSI colors
    #[serde(default = "default_true")]
    pub ansi: bool,

    /// Whether to include target/module
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            targets: BTreeMap::new(),
            ansi: true,
            include_target: true,
        }
    }
}

/// Build the `EnvFilter` directive string from configuration
pub fn build_filter_string(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    for (target, level) in &config.targets {
        filter_str.push_str(&format!(",{}={}", target, level));
    }

    filter_str
}

/// Install the global `tracing` subscriber
///
/// The filter is validated on every call; the subscriber itself is only
/// installed the first time. An already-installed foreign subscriber is left alone.
pub fn init_logging(config: &LoggingConfig) -> ConfigResult<()> {
    let filter_str = build_filter_string(config);
    let filter =
        EnvFilter::try_new(&filter_str).map_err(|e| ConfigError::Logging(e.to_string()))?;

    let ansi = config.ansi;
    let include_target = config.include_target;
    INIT.call_once(move || {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(ansi)
            .with_target(include_target)
            .try_init();
    });

    tracing::debug!(filter = %filter_str, "Logging initialized");
    Ok(())
}

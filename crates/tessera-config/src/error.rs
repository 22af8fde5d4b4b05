//! Configuration errors

use std::path::PathBuf;

/// Result alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading configuration or installing logging
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// TOML parse failure
    #[cfg(feature = "toml")]
    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parse failure
    #[cfg(feature = "yaml")]
    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse failure
    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension does not map to a supported format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Logging filter could not be built or installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

//! Loading [`TesseraConfig`] documents from strings and files

use crate::error::{ConfigError, ConfigResult};
use crate::TesseraConfig;
use std::path::Path;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    #[cfg(feature = "toml")]
    Toml,
    /// `.yaml` / `.yml`
    #[cfg(feature = "yaml")]
    Yaml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            #[cfg(feature = "toml")]
            "toml" => Ok(Self::Toml),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Stateless loader for configuration documents
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse a TOML document
    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> ConfigResult<TesseraConfig> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a YAML document
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(content: &str) -> ConfigResult<TesseraConfig> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> ConfigResult<TesseraConfig> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a document in the given format
    pub fn parse_str(content: &str, format: ConfigFormat) -> ConfigResult<TesseraConfig> {
        match format {
            #[cfg(feature = "toml")]
            ConfigFormat::Toml => Self::from_toml_str(content),
            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => Self::from_yaml_str(content),
            ConfigFormat::Json => Self::from_json_str(content),
        }
    }

    /// Read and parse a file, choosing the format by extension
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<TesseraConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::parse_str(&content, format)?;
        tracing::debug!(
            path = %path.display(),
            topics = config.broker.topics.len(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

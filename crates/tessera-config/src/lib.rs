//! # Tessera Configuration Library
//!
//! Type-safe configuration for the Tessera crates: topic and broker declarations,
//! canvas behaviour, page chrome pass-through, and logging.
//!
//! ## Features
//!
//! - Multi-format support (TOML, YAML, JSON)
//! - `#[serde(default)]` everywhere, so partial documents load cleanly
//! - Idempotent `tracing` subscriber installation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tessera_config::{init_logging, ConfigLoader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("tessera.toml").await?;
//!     init_logging(&config.logging)?;
//!     for topic in &config.broker.topics {
//!         println!("declared topic {}@{}", topic.id, topic.version);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod canvas;
mod error;
mod loader;
mod logging;
mod topic;

pub use canvas::*;
pub use error::*;
pub use loader::*;
pub use logging::*;
pub use topic::*;

use serde::{Deserialize, Serialize};

/// Root configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TesseraConfig {
    /// Logging setup
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Broker and the topics it declares up front
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Behaviour shared by every canvas
    #[serde(default)]
    pub canvas: CanvasConfig,

    /// Page chrome handed to the host untouched
    #[serde(default)]
    pub page: PageConfig,
}

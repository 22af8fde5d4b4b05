//! # Tessera Events
//!
//! Topic-based publish/subscribe for declarative UIs.
//!
//! A [`Broker`] owns [`Topic`]s by id. Handlers register on a topic with a
//! priority, aliases, and a `generic` flag; each registration returns a
//! [`Sender`] that publishes messages addressed to that handler. Failures are
//! captured in a bounded dead-letter queue and then handled according to the
//! topic's [`ErrorStrategy`].
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera_events::{handler, Broker, HandlerOptions};
//! use tessera_config::TopicConfig;
//! use serde_json::json;
//! use std::sync::{Arc, Mutex};
//!
//! let broker = Broker::new("app");
//! let filters = broker.create_topic(TopicConfig::new("filters"))?;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let months = filters.register(
//!     "months_changed",
//!     handler(move |data| {
//!         sink.lock().unwrap().push(data.clone());
//!         Ok(())
//!     }),
//!     HandlerOptions::new().with_priority(10),
//! )?;
//!
//! months.send(json!(["Jan", "Feb"]))?;
//! assert_eq!(*seen.lock().unwrap(), vec![json!(["Jan", "Feb"])]);
//! # Ok::<(), tessera_events::BrokerError>(())
//! ```

#![warn(clippy::all)]

pub mod broker;
pub mod dead_letter;
pub mod error;
pub mod handler;
pub mod message;
pub mod metrics;
pub mod sender;
pub mod topic;

pub use broker::Broker;
pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use error::{BrokerError, BrokerResult, TopicError, TopicResult};
pub use handler::{
    async_handler, handler, topic_error_handler, AsyncHandlerFn, HandlerFn, HandlerInfo,
    HandlerOptions, TopicErrorHandler,
};
pub use message::{TopicMessage, GENERIC_MESSAGE_TYPE, SYSTEM_SENDER};
pub use metrics::{MetricsSnapshot, TopicMetrics, LATENCY_ALPHA};
pub use sender::Sender;
pub use topic::Topic;

pub use tessera_config::{BrokerConfig, ErrorStrategy, TopicConfig};

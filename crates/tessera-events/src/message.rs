//! Messages carried by topics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Sender name used for messages the system fabricates.
pub const SYSTEM_SENDER: &str = "system";

/// Message type of senders created for generic handlers.
pub const GENERIC_MESSAGE_TYPE: &str = "generic";

/// A message published to a topic.
///
/// Unknown top-level fields are kept in `extra`, so a message survives a JSON
/// round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMessage {
    /// Who published the message; checked against the topic's security lists
    pub sender: String,

    /// Handler name or alias the message is addressed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Free-form type tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,

    /// Payload handed to handlers
    #[serde(default)]
    pub data: JsonValue,

    /// Additional fields
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl TopicMessage {
    /// Message from `sender` with a payload and no destination.
    pub fn new(sender: impl Into<String>, data: impl Into<JsonValue>) -> Self {
        Self {
            sender: sender.into(),
            destination: None,
            message_type: None,
            data: data.into(),
            extra: Map::new(),
        }
    }

    /// Placeholder returned when a message could not be sent.
    pub fn system() -> Self {
        Self::new(SYSTEM_SENDER, JsonValue::Null)
    }

    /// Address the message.
    pub fn to(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Tag the message.
    pub fn with_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    /// Attach an extra field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Whether the message is addressed to `name`.
    pub fn is_for(&self, name: &str) -> bool {
        self.destination.as_deref() == Some(name)
    }
}

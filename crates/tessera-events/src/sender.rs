//! Per-handler publishing handles.

use crate::error::{BrokerResult, TopicError};
use crate::message::{TopicMessage, GENERIC_MESSAGE_TYPE};
use crate::topic::{Topic, TopicInner};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Weak;
use tracing::warn;

/// Publishes on behalf of one handler, through the broker that owns its topic.
///
/// Created by [`Topic::register`]. The sender only holds a weak reference to
/// its topic; sending after the topic is gone is logged and does nothing.
#[derive(Clone)]
pub struct Sender {
    topic: Weak<TopicInner>,
    name: String,
    generic: bool,
}

impl Sender {
    pub(crate) fn new(topic: Weak<TopicInner>, name: String, generic: bool) -> Self {
        Self {
            topic,
            name,
            generic,
        }
    }

    /// Name of the handler this sender belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_generic(&self) -> bool {
        self.generic
    }

    /// The topic, while it is alive.
    pub fn topic(&self) -> Option<Topic> {
        self.topic.upgrade().map(Topic::from_inner)
    }

    /// Publish `data` addressed to this sender's handler.
    pub fn send(&self, data: impl Into<JsonValue>) -> BrokerResult<TopicMessage> {
        self.send_with(data, Map::new())
    }

    /// Publish `data` with extra top-level message fields.
    ///
    /// Returns the message that was published. Without a broker the failure
    /// goes through the topic's error strategy and a system message is
    /// returned in its place.
    pub fn send_with(
        &self,
        data: impl Into<JsonValue>,
        extra: Map<String, JsonValue>,
    ) -> BrokerResult<TopicMessage> {
        let Some(topic) = self.topic() else {
            warn!(sender = %self.name, "Topic dropped, message not sent");
            return Ok(TopicMessage::system());
        };

        let message_type = if self.generic {
            GENERIC_MESSAGE_TYPE
        } else {
            self.name.as_str()
        };
        let mut message = TopicMessage::new(format!("{}.{}", topic.full_id(), self.name), data)
            .to(self.name.clone())
            .with_type(message_type);
        message.extra = extra;

        match topic.broker() {
            Some(broker) => {
                broker.publish(topic.id(), message.clone())?;
                Ok(message)
            }
            None => {
                let error = TopicError::NoBroker {
                    topic: topic.full_id().to_string(),
                };
                topic.route_error(error.into(), message.data)?;
                Ok(TopicMessage::system())
            }
        }
    }
}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("name", &self.name)
            .field("generic", &self.generic)
            .field("attached", &(self.topic.strong_count() > 0))
            .finish()
    }
}

impl PartialEq for Sender {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Weak::ptr_eq(&self.topic, &other.topic)
    }
}

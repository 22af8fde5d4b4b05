//! Error types for topics and brokers.

/// Result alias for topic operations.
pub type TopicResult<T> = Result<T, TopicError>;

/// Result alias for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors raised by a topic.
///
/// Every variant except `SenderExists` travels through the topic's error
/// strategy before it reaches a caller.
#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    /// A handler failed under the `raise` strategy.
    #[error("Critical error in topic '{topic}': {source}")]
    Processing {
        topic: String,
        #[source]
        source: anyhow::Error,
    },

    /// The sender is denied by the topic's security policy.
    #[error("Sender '{sender}' blocked by security policy in topic '{topic}'")]
    PermissionDenied { sender: String, topic: String },

    /// A handler with this name already owns a sender.
    #[error("Sender '{name}' already exists in topic '{topic}'")]
    SenderExists { name: String, topic: String },

    /// A sender was used on a topic that no broker owns.
    #[error("No broker assigned to topic '{topic}', cannot send message")]
    NoBroker { topic: String },

    /// An async handler was dispatched outside a tokio runtime.
    #[error("No async runtime available to run handler '{handler}' in topic '{topic}'")]
    NoRuntime { topic: String, handler: String },

    /// An async handler task panicked or was cancelled.
    #[error("Async handler '{handler}' in topic '{topic}' did not complete: {message}")]
    AsyncHandler {
        topic: String,
        handler: String,
        message: String,
    },
}

impl TopicError {
    /// Create a processing error.
    pub fn processing(topic: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Processing {
            topic: topic.into(),
            source,
        }
    }

    /// Check if this is a security rejection.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Errors raised by a broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// No topic registered under this id.
    #[error("Topic with ID '{0}' not found")]
    TopicNotFound(String),

    /// A topic with this id is already registered.
    #[error("Topic with ID '{0}' is already registered")]
    DuplicateTopic(String),

    /// The topic rejected or failed the message.
    #[error(transparent)]
    Topic(#[from] TopicError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_error_display() {
        let err = TopicError::PermissionDenied {
            sender: "bob".into(),
            topic: "filters@1.0.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "Sender 'bob' blocked by security policy in topic 'filters@1.0.0'"
        );
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_processing_keeps_source() {
        use std::error::Error as _;

        let err = TopicError::processing("orders@1.0.0", anyhow::anyhow!("db down"));
        assert_eq!(err.to_string(), "Critical error in topic 'orders@1.0.0': db down");
        assert_eq!(err.source().map(|s| s.to_string()), Some("db down".into()));
    }

    #[test]
    fn test_broker_error_wraps_topic_error() {
        let err: BrokerError = TopicError::NoBroker {
            topic: "alerts@1.0.0".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "No broker assigned to topic 'alerts@1.0.0', cannot send message"
        );
    }
}

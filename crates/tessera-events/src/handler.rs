//! Handler callables, registration options, and ordering.

use crate::message::TopicMessage;
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Synchronous handler; receives the message payload.
pub type HandlerFn = Arc<dyn Fn(&JsonValue) -> anyhow::Result<()> + Send + Sync>;

/// Asynchronous handler; receives an owned copy of the payload.
pub type AsyncHandlerFn =
    Arc<dyn Fn(JsonValue) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Custom error handler for the `custom` strategy.
pub type TopicErrorHandler =
    Arc<dyn Fn(&anyhow::Error, &JsonValue) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure as a [`HandlerFn`].
pub fn handler<F>(f: F) -> HandlerFn
where
    F: Fn(&JsonValue) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap an async closure as an [`AsyncHandlerFn`].
pub fn async_handler<F, Fut>(f: F) -> AsyncHandlerFn
where
    F: Fn(JsonValue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |data| f(data).boxed())
}

/// Wrap a closure as a [`TopicErrorHandler`].
pub fn topic_error_handler<F>(f: F) -> TopicErrorHandler
where
    F: Fn(&anyhow::Error, &JsonValue) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Registration options. The defaults match a bare registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Other destinations this handler answers to
    pub aliases: Vec<String>,
    /// Higher runs earlier
    pub priority: i32,
    /// Run under the owning broker's transaction lock
    pub transactional: bool,
    /// Receive every message regardless of destination
    pub generic: bool,
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    pub fn generic(mut self, generic: bool) -> Self {
        self.generic = generic;
        self
    }
}

/// Public view of a registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerInfo {
    pub name: String,
    pub priority: i32,
    pub aliases: Vec<String>,
    pub generic: bool,
    pub transactional: bool,
    pub is_async: bool,
}

impl HandlerInfo {
    /// Matching rule: destination equals the name or an alias, or the handler is generic.
    pub fn matches(&self, message: &TopicMessage) -> bool {
        if self.generic {
            return true;
        }
        match message.destination.as_deref() {
            Some(destination) => {
                destination == self.name || self.aliases.iter().any(|a| a == destination)
            }
            None => false,
        }
    }

    /// Whether `name` is this handler's name or one of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

#[derive(Clone)]
pub(crate) enum HandlerCallable {
    Sync(HandlerFn),
    Async(AsyncHandlerFn),
}

pub(crate) struct RegisteredHandler {
    pub(crate) info: HandlerInfo,
    pub(crate) callable: HandlerCallable,
}

impl RegisteredHandler {
    pub(crate) fn new(name: String, callable: HandlerCallable, options: HandlerOptions) -> Self {
        let is_async = matches!(callable, HandlerCallable::Async(_));
        Self {
            info: HandlerInfo {
                name,
                priority: options.priority,
                aliases: options.aliases,
                generic: options.generic,
                transactional: options.transactional,
                is_async,
            },
            callable,
        }
    }
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("info", &self.info)
            .finish()
    }
}

/// Insert before the first handler of strictly lower priority.
///
/// Keeps the list sorted by descending priority with equal priorities in
/// registration order.
pub(crate) fn insert_by_priority(
    handlers: &mut Vec<Arc<RegisteredHandler>>,
    handler: Arc<RegisteredHandler>,
) {
    let position = handlers
        .iter()
        .position(|existing| handler.info.priority > existing.info.priority)
        .unwrap_or(handlers.len());
    handlers.insert(position, handler);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, priority: i32) -> Arc<RegisteredHandler> {
        Arc::new(RegisteredHandler::new(
            name.to_string(),
            HandlerCallable::Sync(handler(|_| Ok(()))),
            HandlerOptions::new().with_priority(priority),
        ))
    }

    fn names(handlers: &[Arc<RegisteredHandler>]) -> Vec<&str> {
        handlers.iter().map(|h| h.info.name.as_str()).collect()
    }

    #[test]
    fn test_insert_by_priority() {
        let mut handlers = Vec::new();
        for (name, priority) in [("a", 1), ("b", 5), ("c", 1), ("d", 5), ("e", 0)] {
            insert_by_priority(&mut handlers, entry(name, priority));
        }
        assert_eq!(names(&handlers), vec!["b", "d", "a", "c", "e"]);
    }

    #[test]
    fn test_matching_rule() {
        let info = HandlerInfo {
            name: "save".into(),
            priority: 0,
            aliases: vec!["store".into()],
            generic: false,
            transactional: false,
            is_async: false,
        };
        assert!(info.matches(&TopicMessage::new("ui", JsonValue::Null).to("save")));
        assert!(info.matches(&TopicMessage::new("ui", JsonValue::Null).to("store")));
        assert!(!info.matches(&TopicMessage::new("ui", JsonValue::Null).to("load")));
        assert!(!info.matches(&TopicMessage::new("ui", JsonValue::Null)));

        let generic = HandlerInfo {
            generic: true,
            ..info
        };
        assert!(generic.matches(&TopicMessage::new("ui", JsonValue::Null)));
    }

    #[test]
    fn test_options_builder() {
        let options = HandlerOptions::new()
            .with_alias("a")
            .with_aliases(["b", "c"])
            .with_priority(3)
            .transactional(true);
        assert_eq!(options.aliases, vec!["a", "b", "c"]);
        assert_eq!(options.priority, 3);
        assert!(options.transactional);
        assert!(!options.generic);
    }

    #[tokio::test]
    async fn test_async_handler_wrapper() {
        let f = async_handler(|data| async move {
            anyhow::ensure!(data.is_number(), "expected a number");
            Ok::<(), anyhow::Error>(())
        });
        assert!(f(JsonValue::from(1)).await.is_ok());
        assert!(f(JsonValue::Null).await.is_err());
    }
}

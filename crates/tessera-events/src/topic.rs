//! Topics: named channels with priority-ordered handlers.
//!
//! A [`Topic`] is a cheap, cloneable handle. Registration, publication, and
//! inspection all take `&self`; handlers may publish back into the same topic
//! through their [`Sender`] while a dispatch is running.
//!
//! # Dispatch
//!
//! 1. The sender is checked against the deny list, then the allow list.
//!    Rejections go through the error path as [`TopicError::PermissionDenied`].
//! 2. Handlers run in descending priority. A handler runs when the message
//!    destination is its name or an alias, or when it is generic.
//! 3. Every failure is recorded as a dead letter, then handled by the
//!    topic's [`ErrorStrategy`]. Only `raise` stops the remaining handlers.
//!
//! Async handlers are spawned on the current tokio runtime. Their failures
//! take the same error path once they finish; [`Topic::flush`] waits for them
//! and reports the first raised error.

use crate::broker::{Broker, BrokerInner};
use crate::dead_letter::{DeadLetter, DeadLetterQueue};
use crate::error::{TopicError, TopicResult};
use crate::handler::{
    insert_by_priority, AsyncHandlerFn, HandlerCallable, HandlerFn, HandlerInfo, HandlerOptions,
    RegisteredHandler, TopicErrorHandler,
};
use crate::message::TopicMessage;
use crate::metrics::{MetricsSnapshot, TopicMetrics};
use crate::sender::Sender;
use futures::future::{join_all, FutureExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tessera_config::{ErrorStrategy, TopicConfig};
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, trace, warn};

/// Topic activity: `debug` when the topic is in debug mode, `trace` otherwise.
macro_rules! activity {
    ($topic:expr, $($arg:tt)+) => {
        if $topic.debug {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

pub(crate) use activity;

#[derive(Debug, Default)]
struct SenderPolicy {
    blacklist: HashSet<String>,
    whitelist: Option<HashSet<String>>,
}

impl SenderPolicy {
    fn allows(&self, sender: &str) -> bool {
        if self.blacklist.contains(sender) {
            return false;
        }
        match &self.whitelist {
            Some(whitelist) => whitelist.contains(sender),
            None => true,
        }
    }
}

pub(crate) struct TopicInner {
    id: String,
    version: String,
    full_id: String,
    error_strategy: ErrorStrategy,
    pub(crate) debug: bool,
    error_handler: RwLock<Option<TopicErrorHandler>>,
    policy: RwLock<SenderPolicy>,
    handlers: RwLock<Vec<Arc<RegisteredHandler>>>,
    senders: RwLock<HashMap<String, Sender>>,
    metrics: Mutex<TopicMetrics>,
    dead_letters: DeadLetterQueue,
    broker: RwLock<Weak<BrokerInner>>,
    in_flight: Mutex<Vec<(String, JoinHandle<TopicResult<()>>)>>,
    unreported: Mutex<Option<TopicError>>,
}

/// A named, versioned pub/sub channel.
#[derive(Clone)]
pub struct Topic {
    inner: Arc<TopicInner>,
}

impl Topic {
    /// Create a topic that no broker owns yet.
    pub fn new(config: TopicConfig) -> Self {
        let full_id = config.full_id();
        let whitelist = config
            .whitelist
            .filter(|list| !list.is_empty())
            .map(|list| list.into_iter().collect());

        let topic = Self {
            inner: Arc::new(TopicInner {
                id: config.id,
                version: config.version,
                full_id,
                error_strategy: config.error_strategy,
                debug: config.debug,
                error_handler: RwLock::new(None),
                policy: RwLock::new(SenderPolicy {
                    blacklist: config.blacklist.into_iter().collect(),
                    whitelist,
                }),
                handlers: RwLock::new(Vec::new()),
                senders: RwLock::new(HashMap::new()),
                metrics: Mutex::new(TopicMetrics::default()),
                dead_letters: DeadLetterQueue::new(config.max_dead_letters),
                broker: RwLock::new(Weak::new()),
                in_flight: Mutex::new(Vec::new()),
                unreported: Mutex::new(None),
            }),
        };
        activity!(topic.inner, topic = %topic.full_id(), "Topic initialized");
        topic
    }

    pub(crate) fn from_inner(inner: Arc<TopicInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<TopicInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn attach(&self, broker: Weak<BrokerInner>) {
        *self.inner.broker.write() = broker;
    }

    pub(crate) fn detach(&self) {
        *self.inner.broker.write() = Weak::new();
    }

    /// Topic id, unique within a broker.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// `id@version`
    pub fn full_id(&self) -> &str {
        &self.inner.full_id
    }

    pub fn error_strategy(&self) -> ErrorStrategy {
        self.inner.error_strategy
    }

    pub fn is_debug(&self) -> bool {
        self.inner.debug
    }

    /// The broker that owns this topic, if it is still alive.
    pub fn broker(&self) -> Option<Broker> {
        self.inner.broker.read().upgrade().map(Broker::from_inner)
    }

    /// Install the handler used by the `custom` strategy.
    pub fn set_error_handler(&self, handler: TopicErrorHandler) {
        *self.inner.error_handler.write() = Some(handler);
    }

    // -- security ------------------------------------------------------------

    /// Not denied, and allowed when an allow list exists.
    pub fn is_sender_allowed(&self, sender: &str) -> bool {
        self.inner.policy.read().allows(sender)
    }

    pub fn add_to_blacklist(&self, sender: impl Into<String>) {
        let sender = sender.into();
        if self.inner.policy.write().blacklist.insert(sender.clone()) {
            activity!(self.inner, topic = %self.full_id(), sender = %sender, "Added to blacklist");
        }
    }

    pub fn remove_from_blacklist(&self, sender: &str) {
        if self.inner.policy.write().blacklist.remove(sender) {
            activity!(self.inner, topic = %self.full_id(), sender = %sender, "Removed from blacklist");
        }
    }

    /// Creates the allow list if there is none.
    pub fn add_to_whitelist(&self, sender: impl Into<String>) {
        let sender = sender.into();
        let added = self
            .inner
            .policy
            .write()
            .whitelist
            .get_or_insert_with(HashSet::new)
            .insert(sender.clone());
        if added {
            activity!(self.inner, topic = %self.full_id(), sender = %sender, "Added to whitelist");
        }
    }

    /// Removing the last entry drops the allow list, opening the topic again.
    pub fn remove_from_whitelist(&self, sender: &str) {
        let mut policy = self.inner.policy.write();
        let Some(whitelist) = policy.whitelist.as_mut() else {
            return;
        };
        if whitelist.remove(sender) {
            if whitelist.is_empty() {
                policy.whitelist = None;
            }
            activity!(self.inner, topic = %self.full_id(), sender = %sender, "Removed from whitelist");
        }
    }

    // -- registration --------------------------------------------------------

    /// Register a synchronous handler and return its sender.
    pub fn register(
        &self,
        name: impl Into<String>,
        handler: HandlerFn,
        options: HandlerOptions,
    ) -> TopicResult<Sender> {
        self.add_handler(name.into(), HandlerCallable::Sync(handler), options)
    }

    /// Register an async handler and return its sender.
    pub fn register_async(
        &self,
        name: impl Into<String>,
        handler: AsyncHandlerFn,
        options: HandlerOptions,
    ) -> TopicResult<Sender> {
        self.add_handler(name.into(), HandlerCallable::Async(handler), options)
    }

    fn add_handler(
        &self,
        name: String,
        callable: HandlerCallable,
        options: HandlerOptions,
    ) -> TopicResult<Sender> {
        let sender = {
            let mut senders = self.inner.senders.write();
            if senders.contains_key(&name) {
                return Err(TopicError::SenderExists {
                    name,
                    topic: self.full_id().to_string(),
                });
            }
            let sender = Sender::new(self.downgrade(), name.clone(), options.generic);
            senders.insert(name.clone(), sender.clone());
            sender
        };

        activity!(
            self.inner,
            topic = %self.full_id(),
            handler = %name,
            priority = options.priority,
            transactional = options.transactional,
            "Registering handler"
        );
        let entry = Arc::new(RegisteredHandler::new(name, callable, options));
        insert_by_priority(&mut self.inner.handlers.write(), entry);
        Ok(sender)
    }

    /// Remove a handler and its sender. Returns false if there was none.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = {
            let mut handlers = self.inner.handlers.write();
            let before = handlers.len();
            handlers.retain(|h| h.info.name != name);
            handlers.len() < before
        };
        self.inner.senders.write().remove(name);
        if removed {
            activity!(self.inner, topic = %self.full_id(), handler = %name, "Unregistered handler");
        }
        removed
    }

    // -- inspection ----------------------------------------------------------

    /// Registered handlers, in dispatch order.
    pub fn active_handlers(&self) -> Vec<HandlerInfo> {
        self.inner
            .handlers
            .read()
            .iter()
            .map(|h| h.info.clone())
            .collect()
    }

    /// Handler by name or alias.
    pub fn get_handler(&self, name: &str) -> Option<HandlerInfo> {
        self.inner
            .handlers
            .read()
            .iter()
            .find(|h| h.info.answers_to(name))
            .map(|h| h.info.clone())
    }

    /// Sender of the handler called `name`.
    pub fn sender(&self, name: &str) -> Option<Sender> {
        self.inner.senders.read().get(name).cloned()
    }

    /// Names of all senders, sorted.
    pub fn sender_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.senders.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        let handler_count = self.inner.handlers.read().len();
        let metrics = self.inner.metrics.lock().clone();
        MetricsSnapshot::new(self.full_id(), handler_count, metrics)
    }

    /// Recorded failures, oldest first.
    pub fn get_dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.dead_letters.snapshot()
    }

    // -- dispatch ------------------------------------------------------------

    /// Check the sender, then dispatch.
    pub fn publish_event(&self, message: TopicMessage) -> TopicResult<()> {
        if !self.is_sender_allowed(&message.sender) {
            let rejection = TopicError::PermissionDenied {
                sender: message.sender,
                topic: self.full_id().to_string(),
            };
            return self.route_error(rejection.into(), message.data);
        }

        activity!(
            self.inner,
            topic = %self.full_id(),
            sender = %message.sender,
            destination = ?message.destination,
            "Event published"
        );
        self.handle_event(&message)
    }

    /// Dispatch to matching handlers without a sender check.
    pub fn handle_event(&self, message: &TopicMessage) -> TopicResult<()> {
        let handlers = self.inner.handlers.read().clone();
        for handler in handlers.iter().filter(|h| h.info.matches(message)) {
            match &handler.callable {
                HandlerCallable::Sync(f) => {
                    if let Err(error) = self.invoke(handler, f, &message.data) {
                        self.route_error(error, message.data.clone())?;
                    }
                }
                HandlerCallable::Async(f) => {
                    self.spawn(handler, Arc::clone(f), message.data.clone())?;
                }
            }
        }
        Ok(())
    }

    fn invoke(
        &self,
        handler: &RegisteredHandler,
        f: &HandlerFn,
        data: &JsonValue,
    ) -> anyhow::Result<()> {
        let start = Instant::now();
        let result = match self.broker().filter(|_| handler.info.transactional) {
            Some(broker) => {
                let _transaction = broker.transaction();
                f(data)
            }
            None => f(data),
        };

        let mut metrics = self.inner.metrics.lock();
        match &result {
            Ok(()) => metrics.record_success(start.elapsed()),
            Err(_) => metrics.record_failure(),
        }
        result
    }

    fn spawn(
        &self,
        handler: &RegisteredHandler,
        f: AsyncHandlerFn,
        data: JsonValue,
    ) -> TopicResult<()> {
        let name = handler.info.name.clone();
        let Ok(runtime) = Handle::try_current() else {
            let error = TopicError::NoRuntime {
                topic: self.full_id().to_string(),
                handler: name,
            };
            return self.route_error(error.into(), data);
        };

        let topic = self.clone();
        let transactional = handler.info.transactional;
        let task_name = name.clone();
        let task = runtime.spawn(async move {
            let start = Instant::now();
            let result = match topic.broker().filter(|_| transactional) {
                Some(broker) => {
                    let _transaction = broker.async_transaction().await;
                    f(data.clone()).await
                }
                None => f(data.clone()).await,
            };

            match result {
                Ok(()) => {
                    topic.inner.metrics.lock().record_success(start.elapsed());
                    Ok(())
                }
                Err(failure) => {
                    topic.inner.metrics.lock().record_failure();
                    let routed = topic.route_error(failure, data);
                    if let Err(raised) = &routed {
                        error!(topic = %topic.full_id(), handler = %task_name, error = %raised, "Async handler failed");
                    }
                    routed
                }
            }
        });
        self.reap_finished();
        self.inner.in_flight.lock().push((name, task));
        Ok(())
    }

    /// Drop handles of tasks that already finished.
    ///
    /// The first raised error among them is kept for the next `flush`.
    fn reap_finished(&self) {
        let finished: Vec<_> = {
            let mut in_flight = self.inner.in_flight.lock();
            let (finished, running) = std::mem::take(&mut *in_flight)
                .into_iter()
                .partition(|(_, task)| task.is_finished());
            *in_flight = running;
            finished
        };

        for (name, mut task) in finished {
            match (&mut task).now_or_never() {
                Some(joined) => {
                    if let Err(error) = self.settle(name, joined) {
                        self.inner.unreported.lock().get_or_insert(error);
                    }
                }
                // Cooperative budget exhausted; try again later.
                None => self.inner.in_flight.lock().push((name, task)),
            }
        }
    }

    fn settle(&self, name: String, joined: Result<TopicResult<()>, JoinError>) -> TopicResult<()> {
        match joined {
            Ok(result) => result,
            Err(join_error) => {
                let error = TopicError::AsyncHandler {
                    topic: self.full_id().to_string(),
                    handler: name,
                    message: join_error.to_string(),
                };
                self.route_error(error.into(), JsonValue::Null)
            }
        }
    }

    /// Wait for every in-flight async handler, including ones they spawn.
    ///
    /// Returns the first error the `raise` strategy produced.
    pub async fn flush(&self) -> TopicResult<()> {
        let mut first = self.inner.unreported.lock().take();
        loop {
            let batch = std::mem::take(&mut *self.inner.in_flight.lock());
            if batch.is_empty() {
                break;
            }
            let (names, tasks): (Vec<_>, Vec<_>) = batch.into_iter().unzip();
            for (name, joined) in names.into_iter().zip(join_all(tasks).await) {
                if let Err(error) = self.settle(name, joined) {
                    first.get_or_insert(error);
                }
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Number of async handlers still running.
    pub fn pending(&self) -> usize {
        self.reap_finished();
        self.inner.in_flight.lock().len()
    }

    /// Record a failure and apply the error strategy.
    ///
    /// Returns `Err` only under `raise`. Topic errors keep their variant;
    /// anything else becomes [`TopicError::Processing`].
    pub(crate) fn route_error(&self, failure: anyhow::Error, data: JsonValue) -> TopicResult<()> {
        if !self
            .inner
            .dead_letters
            .push(DeadLetter::new(&failure, data.clone()))
        {
            trace!(topic = %self.full_id(), "Dead letter queue full, dropping failure");
        }

        match self.inner.error_strategy {
            ErrorStrategy::Raise => Err(match failure.downcast::<TopicError>() {
                Ok(error) => error,
                Err(other) => TopicError::processing(self.full_id(), other),
            }),
            ErrorStrategy::Warn => {
                warn!(topic = %self.full_id(), error = %format!("{failure:#}"), "Non-critical error in topic");
                Ok(())
            }
            ErrorStrategy::Ignore => Ok(()),
            ErrorStrategy::Custom => {
                let handler = self.inner.error_handler.read().clone();
                match handler {
                    Some(handler) => {
                        if let Err(e) = handler(&failure, &data) {
                            error!(topic = %self.full_id(), error = %e, "Error in custom error handler");
                        }
                    }
                    None => {
                        debug!(topic = %self.full_id(), error = %failure, "No custom error handler installed");
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<TopicConfig> for Topic {
    fn from(config: TopicConfig) -> Self {
        Self::new(config)
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("full_id", &self.inner.full_id)
            .field("error_strategy", &self.inner.error_strategy)
            .field("handlers", &self.inner.handlers.read().len())
            .field("dead_letters", &self.inner.dead_letters.len())
            .finish()
    }
}

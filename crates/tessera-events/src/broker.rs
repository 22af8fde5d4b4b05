//! Broker: a registry of topics that routes publications by topic id.

use crate::error::{BrokerError, BrokerResult, TopicResult};
use crate::message::TopicMessage;
use crate::topic::{activity, Topic};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tessera_config::{BrokerConfig, TopicConfig};
use tracing::info;

pub(crate) struct BrokerInner {
    name: String,
    pub(crate) debug: bool,
    topics: RwLock<HashMap<String, Topic>>,
    transaction: ReentrantMutex<()>,
    async_transaction: tokio::sync::Mutex<()>,
}

/// Owns topics and routes publications to them.
///
/// Cloning yields another handle to the same broker. Topics hold only a weak
/// reference back; once the last handle is dropped their senders report
/// `NoBroker`.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl Broker {
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), false)
    }

    /// Build a broker and create every topic the config declares.
    pub fn from_config(config: &BrokerConfig) -> BrokerResult<Self> {
        let broker = Self::build(config.name.clone(), config.debug);
        for topic in &config.topics {
            broker.create_topic(topic.clone())?;
        }
        info!(
            broker = %broker.name(),
            topics = config.topics.len(),
            "Broker created from config"
        );
        Ok(broker)
    }

    fn build(name: String, debug: bool) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                name,
                debug,
                topics: RwLock::new(HashMap::new()),
                transaction: ReentrantMutex::new(()),
                async_transaction: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<BrokerInner>) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Create a topic owned by this broker.
    pub fn create_topic(&self, config: TopicConfig) -> BrokerResult<Topic> {
        let topic = Topic::new(config);
        self.subscribe(topic.clone())?;
        Ok(topic)
    }

    /// Take ownership of an existing topic.
    ///
    /// Fails with [`BrokerError::DuplicateTopic`] if the id is taken. The topic
    /// is left untouched in that case.
    pub fn subscribe(&self, topic: Topic) -> BrokerResult<()> {
        let mut topics = self.inner.topics.write();
        if topics.contains_key(topic.id()) {
            return Err(BrokerError::DuplicateTopic(topic.id().to_string()));
        }
        topic.attach(Arc::downgrade(&self.inner));
        activity!(
            self.inner,
            broker = %self.inner.name,
            topic = %topic.full_id(),
            "Topic subscribed"
        );
        topics.insert(topic.id().to_string(), topic);
        Ok(())
    }

    /// Route a message to the topic with id `topic_id`.
    pub fn publish(&self, topic_id: &str, message: TopicMessage) -> BrokerResult<()> {
        let topic = self
            .topic(topic_id)
            .ok_or_else(|| BrokerError::TopicNotFound(topic_id.to_string()))?;
        topic.publish_event(message)?;
        Ok(())
    }

    pub fn topic(&self, id: &str) -> Option<Topic> {
        self.inner.topics.read().get(id).cloned()
    }

    /// Ids of all topics, sorted.
    pub fn topic_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.inner.topics.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Detach and return the topic. Its senders stop routing.
    pub fn remove_topic(&self, id: &str) -> Option<Topic> {
        let topic = self.inner.topics.write().remove(id)?;
        topic.detach();
        activity!(self.inner, broker = %self.inner.name, topic = %topic.full_id(), "Topic removed");
        Some(topic)
    }

    /// Hold the broker's transaction lock.
    ///
    /// Transactional handlers take the same lock. It is re-entrant, so a
    /// handler may publish while holding it.
    pub fn transaction(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.transaction.lock()
    }

    /// Whether any thread holds the transaction lock.
    pub fn in_transaction(&self) -> bool {
        self.inner.transaction.is_locked()
    }

    pub(crate) async fn async_transaction(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.inner.async_transaction.lock().await
    }

    /// Wait for async handlers on every topic. Returns the first raised error.
    pub async fn flush(&self) -> TopicResult<()> {
        let topics: Vec<_> = self.inner.topics.read().values().cloned().collect();
        let mut first = None;
        for topic in topics {
            if let Err(error) = topic.flush().await {
                first.get_or_insert(error);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new("broker")
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("name", &self.inner.name)
            .field("topics", &self.topic_ids())
            .finish()
    }
}

//! Bounded capture of failed events.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;

/// A failure and the payload that caused it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadLetter {
    /// Rendered error chain
    pub error: String,
    /// Payload of the failed message (`TopicMessage::data`), `null` when
    /// there was none. The sender and handler appear in `error`.
    pub data: JsonValue,
    /// When the failure was recorded
    pub recorded_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(error: &anyhow::Error, data: JsonValue) -> Self {
        Self {
            error: format!("{error:#}"),
            data,
            recorded_at: Utc::now(),
        }
    }
}

/// Fixed-capacity queue of dead letters.
///
/// Pushing never blocks. Once full, new letters are dropped and the oldest
/// ones are kept.
#[derive(Debug)]
pub struct DeadLetterQueue {
    letters: Mutex<VecDeque<DeadLetter>>,
    capacity: usize,
}

impl DeadLetterQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            letters: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record a letter. Returns false if the queue was full and it was dropped.
    pub fn push(&self, letter: DeadLetter) -> bool {
        let mut letters = self.letters.lock();
        if letters.len() >= self.capacity {
            return false;
        }
        letters.push_back(letter);
        true
    }

    /// Copy of the retained letters, oldest first.
    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.letters.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.letters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

//! Durable state behind interactive components.
//!
//! The host keeps a key-value store alive across reruns; this module only
//! consumes it through [`StateStore`]. [`StateBinding`] is the capability a
//! stateful renderable carries, and [`SessionState`] is the application-level
//! wrapper for values that are not tied to a widget.

use crate::error::{StateError, StateResult};
use crate::props::Props;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// External key-value store consumed by stateful components.
pub trait StateStore: Send + Sync {
    /// Current value for `key`.
    fn get(&self, key: &str) -> Option<JsonValue>;

    /// Store `value` under `key`.
    fn set(&self, key: &str, value: JsonValue);

    /// Remove `key`.
    fn delete(&self, key: &str);

    /// Whether `key` is present.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// In-process [`StateStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, JsonValue>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: JsonValue) {
        self.values.write().insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.values.write().remove(key);
    }

    fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }
}

/// Stateful capability: links a renderable to a key in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBinding {
    /// Key into the store
    pub key: Option<String>,
    /// Whether `set_state` is allowed
    pub editable: bool,
    /// Whether a key is mandatory
    pub strict: bool,
}

impl Default for StateBinding {
    fn default() -> Self {
        Self {
            key: None,
            editable: false,
            strict: true,
        }
    }
}

impl StateBinding {
    /// Binding keyed by the `key` keyword argument, if any.
    pub fn from_props(props: &Props) -> Self {
        Self {
            key: props.key().map(str::to_string),
            ..Self::default()
        }
    }

    /// Set the key.
    pub fn set_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.key = Some(key.into());
        self
    }

    /// Allow or forbid writes.
    pub fn set_editable(&mut self, editable: bool) -> &mut Self {
        self.editable = editable;
        self
    }

    /// Require or relax the key requirement.
    pub fn set_strict(&mut self, strict: bool) -> &mut Self {
        self.strict = strict;
        self
    }

    /// Key to use, or an error when strict and missing.
    ///
    /// Returns `Ok(None)` for a lenient binding without a key.
    pub fn require_key(&self, component: &str) -> StateResult<Option<&str>> {
        match (&self.key, self.strict) {
            (Some(key), _) => Ok(Some(key)),
            (None, true) => Err(StateError::MissingKey(component.to_string())),
            (None, false) => Ok(None),
        }
    }

    /// Read the bound value.
    pub fn track_state(&self, store: &dyn StateStore, component: &str) -> StateResult<Option<JsonValue>> {
        Ok(self
            .require_key(component)?
            .and_then(|key| store.get(key)))
    }

    /// Write the bound value. Requires `editable`.
    pub fn set_state(
        &self,
        store: &dyn StateStore,
        component: &str,
        value: JsonValue,
    ) -> StateResult<()> {
        if !self.editable {
            return Err(StateError::NotEditable(component.to_string()));
        }
        match self.require_key(component)? {
            Some(key) => {
                store.set(key, value);
                Ok(())
            }
            None => Err(StateError::MissingKey(component.to_string())),
        }
    }
}

/// A named value in the store that survives reruns.
pub struct SessionState {
    store: Arc<dyn StateStore>,
    key: String,
}

impl SessionState {
    /// Bind to `key`, writing `initial` only if the key is absent.
    pub fn new(store: Arc<dyn StateStore>, key: impl Into<String>, initial: JsonValue) -> Self {
        let key = key.into();
        if !store.contains(&key) {
            store.set(&key, initial);
        }
        Self { store, key }
    }

    /// Bound key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value.
    pub fn value(&self) -> StateResult<JsonValue> {
        Self::get(self.store.as_ref(), &self.key)
    }

    /// Replace the value.
    pub fn set_value(&self, value: JsonValue) {
        self.store.set(&self.key, value);
    }

    /// Closure that writes the value and returns what was stored.
    pub fn setter(&self) -> impl Fn(JsonValue) -> Option<JsonValue> + Send + Sync + 'static {
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        move |value| {
            store.set(&key, value);
            store.get(&key)
        }
    }

    /// Closure that reads the current value.
    pub fn tracker(&self) -> impl Fn() -> Option<JsonValue> + Send + Sync + 'static {
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        move || store.get(&key)
    }

    /// Read `key` from `store`, failing when absent.
    pub fn get(store: &dyn StateStore, key: &str) -> StateResult<JsonValue> {
        store
            .get(key)
            .ok_or_else(|| StateError::KeyNotFound(key.to_string()))
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("key", &self.key)
            .field("value", &self.store.get(&self.key))
            .finish()
    }
}

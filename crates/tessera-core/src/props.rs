//! Arguments handed to host primitives and the handles they return.
//!
//! [`Props`] is the positional + keyword argument bundle a component is
//! declared with. [`Output`] is what a host primitive hands back: a plain
//! value for widgets, a single [`Region`] for row-style containers, or an
//! indexable list of regions for column-style containers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

/// Positional and keyword arguments for a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Props {
    /// Positional arguments, in order
    #[serde(default)]
    pub args: Vec<JsonValue>,

    /// Keyword arguments; keys are unique
    #[serde(default)]
    pub kwargs: Map<String, JsonValue>,
}

impl Props {
    /// Empty argument bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<JsonValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Set a keyword argument, replacing any previous value.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Shorthand for the `key` keyword argument.
    pub fn with_key(self, key: impl Into<String>) -> Self {
        self.kwarg("key", key.into())
    }

    /// True when there are neither positional nor keyword arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    /// The `key` keyword argument, when it is a string.
    pub fn key(&self) -> Option<&str> {
        self.kwargs.get("key").and_then(JsonValue::as_str)
    }

    /// Look up a keyword argument.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.kwargs.get(key)
    }
}

/// A drawable area the host lets us enter and leave.
///
/// Entering routes subsequent host calls into this region until the
/// matching exit. Implementations use interior mutability.
pub trait Region: Send + Sync {
    /// Start routing output into this region.
    fn enter(&self);

    /// Stop routing output into this region.
    fn exit(&self);
}

/// Keeps a [`Region`] entered for as long as it lives.
///
/// Exit runs on drop, so it also runs when rendering inside bails out early.
pub struct ScopeGuard<'a> {
    region: &'a dyn Region,
}

impl<'a> ScopeGuard<'a> {
    /// Enter `region` and return the guard that will exit it.
    pub fn enter(region: &'a dyn Region) -> Self {
        region.enter();
        Self { region }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.region.exit();
    }
}

/// Handle returned by a host primitive.
#[derive(Clone, Default)]
pub enum Output {
    /// The primitive returned nothing
    #[default]
    Empty,
    /// A widget value (button state, text input contents, ...)
    Value(JsonValue),
    /// One region, as returned by row-style containers
    Region(Arc<dyn Region>),
    /// Indexable regions, as returned by column-style containers
    Regions(Vec<Arc<dyn Region>>),
}

impl Output {
    /// Wrap a value.
    pub fn value(value: impl Into<JsonValue>) -> Self {
        Self::Value(value.into())
    }

    /// Whether effects should fire for this output.
    ///
    /// Values follow JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}`
    /// are falsy. Regions are always truthy; region lists when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Empty => false,
            Self::Value(v) => json_truthy(v),
            Self::Region(_) => true,
            Self::Regions(r) => !r.is_empty(),
        }
    }

    /// The wrapped value, if this is a value.
    pub fn as_value(&self) -> Option<&JsonValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Region(_) => write!(f, "Region(..)"),
            Self::Regions(r) => write!(f, "Regions(len={})", r.len()),
        }
    }
}

impl From<JsonValue> for Output {
    fn from(value: JsonValue) -> Self {
        Self::Value(value)
    }
}

fn json_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

//! Identifiers for layers and layer entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a layer: an integer or a name.
///
/// Serialized untagged, so `3` and `"sidebar"` are both valid ids. When an id
/// comes back from a JSON object key (always a string), integer-looking keys
/// become [`LayerId::Index`]; see [`LayerId::from_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerId {
    /// Numeric id, typically used for columns
    Index(i64),
    /// Named id
    Name(String),
}

impl LayerId {
    /// Fresh random id, used for layers created without one.
    pub fn generate() -> Self {
        Self::Name(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Parse a JSON object key back into an id.
    pub fn from_key(key: &str) -> Self {
        key.parse::<i64>()
            .map(Self::Index)
            .unwrap_or_else(|_| Self::Name(key.to_string()))
    }

    /// Whether `key` names this layer.
    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            Self::Index(i) => key.parse::<i64>().map(|k| k == *i).unwrap_or(false),
            Self::Name(name) => name == key,
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for LayerId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for LayerId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<i64> for LayerId {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<i32> for LayerId {
    fn from(index: i32) -> Self {
        Self::Index(index.into())
    }
}

/// Address of an entry inside a layer.
///
/// A position indexes the element list directly. A key matches a parser whose
/// props carry `key == <key>`, or a nested layer whose id is `<key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    /// Zero-based position
    Position(usize),
    /// `key` keyword argument or nested layer id
    Key(String),
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(p) => write!(f, "#{p}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}

impl From<usize> for EntryId {
    fn from(position: usize) -> Self {
        Self::Position(position)
    }
}

impl From<&str> for EntryId {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for EntryId {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<&LayerId> for EntryId {
    fn from(id: &LayerId) -> Self {
        Self::Key(id.to_string())
    }
}

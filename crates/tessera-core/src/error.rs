//! Error types for rendering, schema handling, and state access.
//!
//! The taxonomy follows where a failure is detected:
//!
//! - [`RenderError`]: raised while invoking a renderable (configuration problems
//!   detected at call time, fatal component failures, failed lookups).
//! - [`SchemaError`]: structural problems (unknown layers/entries) and
//!   serialization/deserialization failures.
//! - [`StateError`]: reads and writes against the external key-value store.
//!
//! Failures raised by user callables (components, effects) travel as
//! [`anyhow::Error`] until a renderable decides what to do with them.

use crate::schema::{EntryId, LayerId};

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type for schema and serialization operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors surfaced while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A renderable was invoked before its base component was set.
    #[error("Base component is not set for renderable '{renderable}'")]
    MissingBaseComponent { renderable: String },

    /// A strict interactive component has no state key.
    #[error("Component '{component}' is strict and requires a state key")]
    MissingStateKey { component: String },

    /// An unrecovered failure from a component whose `fatal` flag is set.
    #[error("Fatal render failure in '{component}': {source}")]
    Fatal {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    /// A raw callable placed directly in a layer failed.
    #[error("Callable '{name}' failed: {source}")]
    Callable {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The host returned a handle that does not fit the container layout.
    #[error("Container '{component}' expected {expected} from its base component")]
    Layout {
        component: String,
        expected: &'static str,
    },

    /// A lookup inside the schema failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl RenderError {
    /// Create a fatal render error.
    pub fn fatal(component: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Fatal {
            component: component.into(),
            source,
        }
    }

    /// Check if this is a configuration problem rather than a component failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingBaseComponent { .. } | Self::MissingStateKey { .. }
        )
    }
}

/// Errors in schema structure and (de)serialization.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// No sub-layer with this id.
    #[error("Layer '{0}' does not exist")]
    UnknownLayer(LayerId),

    /// No element at this position or with this key.
    #[error("Entry '{entry}' not found in layer '{layer}'")]
    UnknownEntry { layer: LayerId, entry: EntryId },

    /// A serialized component name did not resolve.
    #[error("Component '{0}' not found in the component map")]
    UnknownComponent(String),

    /// A serialized element carries an unrecognised `__type__`.
    #[error("Unknown element type '{0}'")]
    UnknownType(String),

    /// A required key is absent.
    #[error("Serialized element is missing '{0}'")]
    MissingField(&'static str),

    /// The data has the wrong shape.
    #[error("Malformed serialized data: {0}")]
    Malformed(String),

    /// JSON conversion failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    /// Create a malformed-data error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Errors from the external key-value store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The key is not present in the store.
    #[error("Session state key '{0}' not found")]
    KeyNotFound(String),

    /// The component was not marked editable.
    #[error("State of '{0}' is not editable")]
    NotEditable(String),

    /// A strict component has no key to resolve.
    #[error("Component '{0}' is strict and has no state key")]
    MissingKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_display() {
        let err = RenderError::MissingBaseComponent {
            renderable: "text".into(),
        };
        assert_eq!(
            err.to_string(),
            "Base component is not set for renderable 'text'"
        );
        assert!(err.is_configuration());

        let err = RenderError::fatal("button", anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "Fatal render failure in 'button': boom");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_fatal_preserves_source() {
        use std::error::Error as _;

        let err = RenderError::fatal("chart", anyhow::anyhow!("bad data"));
        let source = err.source().expect("source should be kept");
        assert_eq!(source.to_string(), "bad data");
    }

    #[test]
    fn test_schema_error_into_render_error() {
        let err: RenderError = SchemaError::UnknownLayer(LayerId::from("side")).into();
        assert_eq!(err.to_string(), "Layer 'side' does not exist");
    }
}

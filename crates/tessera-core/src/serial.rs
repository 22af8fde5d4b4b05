//! Wire records shared by renderable, parser, and layer serialization.
//!
//! Discriminator keys are wrapped in double underscores so they never collide
//! with user keyword arguments.

use crate::component::Component;
use crate::error::{SchemaError, SchemaResult};
use crate::props::Props;
use crate::registry::ComponentMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

pub(crate) const TYPE_KEY: &str = "__type__";
pub(crate) const LAYER_KEY: &str = "__layer__";
pub(crate) const ORDER_KEY: &str = "__order__";
pub(crate) const COMPONENT_KEY: &str = "__component__";

/// Discriminator for a materialized renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseKind {
    /// Plain display element
    Renderable,
    /// Element bound to the state store
    Stateful,
    /// Element with a nested schema
    Container,
}

/// Serialized render state (`__base__`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BaseRecord {
    #[serde(rename = "__component__")]
    pub component: String,

    #[serde(rename = "__args__", default)]
    pub args: Props,

    #[serde(rename = "__type__")]
    pub kind: BaseKind,

    #[serde(default)]
    pub fatal: bool,

    #[serde(default)]
    pub top_render: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_based: Option<bool>,

    #[serde(rename = "__schema__", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
}

/// Serialized parser flags (`__parser__`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct ParserFlags {
    #[serde(default)]
    pub stateful: bool,

    #[serde(default)]
    pub fatal: bool,

    #[serde(default = "default_true")]
    pub strict: bool,

    #[serde(default = "default_true")]
    pub autoconfig: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_based: Option<bool>,
}

impl Default for ParserFlags {
    fn default() -> Self {
        Self {
            stateful: false,
            fatal: false,
            strict: true,
            autoconfig: true,
            column_based: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A whole serialized parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ParserRecord {
    #[serde(rename = "__base__")]
    pub base: BaseRecord,

    #[serde(rename = "__parser__", default)]
    pub parser: ParserFlags,

    #[serde(rename = "__type__")]
    pub kind: String,
}

impl ParserRecord {
    /// Decode a parser record. Wrongly typed flags are rejected, not coerced.
    pub fn from_value(data: &JsonValue) -> SchemaResult<Self> {
        let object = data
            .as_object()
            .ok_or_else(|| SchemaError::malformed("serialized parser must be an object"))?;
        let base = object
            .get("__base__")
            .ok_or(SchemaError::MissingField("__base__"))?;
        let base: BaseRecord = serde_json::from_value(base.clone())
            .map_err(|e| SchemaError::malformed(format!("__base__: {e}")))?;
        let parser = match object.get("__parser__") {
            Some(flags) => serde_json::from_value(flags.clone())
                .map_err(|e| SchemaError::malformed(format!("__parser__: {e}")))?,
            None => ParserFlags::default(),
        };
        let kind = object
            .get(TYPE_KEY)
            .and_then(JsonValue::as_str)
            .ok_or(SchemaError::MissingField("__type__"))?
            .to_string();
        Ok(Self { base, parser, kind })
    }
}

/// Resolve a serialized component name.
///
/// Unknown names fail in strict mode; otherwise a warning is logged and a
/// no-op stand-in keeps the tree usable.
pub(crate) fn resolve_component(
    components: &dyn ComponentMap,
    name: &str,
    strict: bool,
) -> SchemaResult<Component> {
    match components.resolve(name) {
        Some(component) => Ok(component),
        None if strict => Err(SchemaError::UnknownComponent(name.to_string())),
        None => {
            warn!(component = %name, "Component not found in the component map, using a no-op stand-in");
            Ok(Component::noop(name))
        }
    }
}

//! Entries a layer can hold.

use super::layer::Layer;
use crate::component::Component;
use crate::error::{RenderError, RenderResult, SchemaError, SchemaResult};
use crate::parser::{ComponentParser, LayoutParser, Parser};
use crate::props::Props;
use crate::registry::ComponentMap;
use crate::render::RenderOutcome;
use crate::serial::{resolve_component, COMPONENT_KEY, LAYER_KEY, TYPE_KEY};
use serde_json::{json, Value as JsonValue};
use tracing::warn;

/// One entry of a [`Layer`].
#[derive(Debug, Clone)]
pub enum Element {
    /// Leaf parser
    Component(ComponentParser),
    /// Container parser with its own schema
    Layout(LayoutParser),
    /// Nested layer
    Layer(Layer),
    /// Raw callable invoked with no arguments
    Callable(Component),
}

impl Element {
    /// Discriminator written to `__type__`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Component(_) => ComponentParser::TYPE_NAME,
            Self::Layout(_) => LayoutParser::TYPE_NAME,
            Self::Layer(_) => "Layer",
            Self::Callable(_) => "Callable",
        }
    }

    /// The `key` keyword argument of a parser entry.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Component(parser) => parser.props().key(),
            Self::Layout(parser) => parser.props().key(),
            Self::Layer(_) | Self::Callable(_) => None,
        }
    }

    /// Whether a string key addresses this entry.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Layer(layer) => layer.id().matches_key(key),
            other => other.key() == Some(key),
        }
    }

    /// Nested layer, if this entry is one.
    pub fn as_layer(&self) -> Option<&Layer> {
        match self {
            Self::Layer(layer) => Some(layer),
            _ => None,
        }
    }

    /// Mutable nested layer, if this entry is one.
    pub fn as_layer_mut(&mut self) -> Option<&mut Layer> {
        match self {
            Self::Layer(layer) => Some(layer),
            _ => None,
        }
    }

    /// Render this entry. Parsers are parsed afresh on every call.
    ///
    /// Fatal failures come back as `Err`; non-fatal ones stay in the outcomes.
    pub fn render(&self) -> RenderResult<Vec<RenderOutcome>> {
        match self {
            Self::Component(parser) => Ok(vec![parser.call()?.escalate()?]),
            Self::Layout(parser) => Ok(vec![parser.call()?.escalate()?]),
            Self::Layer(layer) => layer.render(),
            Self::Callable(component) => {
                let output = component
                    .call(&Props::new())
                    .map_err(|source| RenderError::Callable {
                        name: component.name().to_string(),
                        source,
                    })?;
                Ok(vec![RenderOutcome::Rendered(output)])
            }
        }
    }

    /// Serialize with a `__type__` discriminator.
    pub fn serialize(&self) -> SchemaResult<JsonValue> {
        match self {
            Self::Component(parser) => parser.serialize(),
            Self::Layout(parser) => parser.serialize(),
            Self::Layer(layer) => Ok(json!({
                TYPE_KEY: self.type_name(),
                LAYER_KEY: layer.serialize()?,
            })),
            Self::Callable(component) => Ok(json!({
                TYPE_KEY: self.type_name(),
                COMPONENT_KEY: component.name(),
            })),
        }
    }

    /// Dispatch on `__type__`.
    ///
    /// An unknown or missing discriminator fails in strict mode and is skipped
    /// with a warning otherwise (`Ok(None)`). The same holds for an entry
    /// of a known type that fails to decode.
    pub fn deserialize(
        data: &JsonValue,
        components: &dyn ComponentMap,
        strict: bool,
    ) -> SchemaResult<Option<Self>> {
        let Some(kind) = data.get(TYPE_KEY).and_then(JsonValue::as_str) else {
            if strict {
                return Err(SchemaError::MissingField("__type__"));
            }
            warn!("Skipping serialized element without a __type__");
            return Ok(None);
        };

        match Self::decode(kind, data, components, strict) {
            Err(error) if !strict => {
                warn!(element_type = %kind, error = %error, "Skipping malformed serialized element");
                Ok(None)
            }
            decoded => decoded,
        }
    }

    fn decode(
        kind: &str,
        data: &JsonValue,
        components: &dyn ComponentMap,
        strict: bool,
    ) -> SchemaResult<Option<Self>> {
        let element = match kind {
            ComponentParser::TYPE_NAME => {
                Self::Component(ComponentParser::deserialize(data, components, strict)?)
            }
            LayoutParser::TYPE_NAME => {
                Self::Layout(LayoutParser::deserialize(data, components, strict)?)
            }
            "Layer" => {
                let layer = data.get(LAYER_KEY).ok_or(SchemaError::MissingField("__layer__"))?;
                Self::Layer(Layer::deserialize(layer, components, strict)?)
            }
            "Callable" => {
                let name = data
                    .get(COMPONENT_KEY)
                    .and_then(JsonValue::as_str)
                    .ok_or(SchemaError::MissingField("__component__"))?;
                Self::Callable(resolve_component(components, name, strict)?)
            }
            other if strict => return Err(SchemaError::UnknownType(other.to_string())),
            other => {
                warn!(element_type = %other, "Skipping serialized element of unknown type");
                return Ok(None);
            }
        };
        Ok(Some(element))
    }
}

impl From<ComponentParser> for Element {
    fn from(parser: ComponentParser) -> Self {
        Self::Component(parser)
    }
}

impl From<LayoutParser> for Element {
    fn from(parser: LayoutParser) -> Self {
        Self::Layout(parser)
    }
}

impl From<Layer> for Element {
    fn from(layer: Layer) -> Self {
        Self::Layer(layer)
    }
}

impl From<Component> for Element {
    fn from(component: Component) -> Self {
        Self::Callable(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::Output;
    use crate::schema::Schema;
    use std::collections::HashMap;

    #[test]
    fn test_element_matches_key() {
        let text = Component::noop("text");
        let parser = ComponentParser::new(text.clone(), Props::new().with_key("title"));
        assert!(Element::from(parser).matches("title"));
        assert!(Element::from(Layer::new("side")).matches("side"));
        assert!(Element::from(Layer::new(2)).matches("2"));
        assert!(!Element::from(text).matches("text"));
    }

    #[test]
    fn test_callable_failure_is_reported() {
        let element = Element::from(Component::new("refresh", |_| Err(anyhow::anyhow!("nope"))));
        let err = element.render().unwrap_err();
        assert!(matches!(err, RenderError::Callable { ref name, .. } if name == "refresh"));
    }

    #[test]
    fn test_callable_output_is_kept() {
        let element = Element::from(Component::new("divider", |_| Ok(Output::value(true))));
        let outcomes = element.render().unwrap();
        assert!(outcomes[0].is_truthy());
    }

    #[test]
    fn test_unknown_type_strict_and_lenient() {
        let components: HashMap<String, Component> = HashMap::new();
        let data = json!({"__type__": "Mystery"});

        let err = Element::deserialize(&data, &components, true).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(ref t) if t == "Mystery"));
        assert!(Element::deserialize(&data, &components, false).unwrap().is_none());

        let untyped = json!({"__base__": {}});
        assert!(matches!(
            Element::deserialize(&untyped, &components, true).unwrap_err(),
            SchemaError::MissingField("__type__")
        ));
        assert!(Element::deserialize(&untyped, &components, false).unwrap().is_none());
    }

    #[test]
    fn test_malformed_entry_strict_and_lenient() {
        let components: HashMap<String, Component> =
            [("text".to_string(), Component::noop("text"))].into();
        let malformed = [
            json!({"__type__": "ComponentParser"}),
            json!({"__type__": "Layer"}),
            json!({"__type__": "Callable"}),
        ];

        for data in &malformed {
            assert!(Element::deserialize(data, &components, true).is_err());
            assert!(Element::deserialize(data, &components, false).unwrap().is_none());
        }

        let valid = Element::from(ComponentParser::new(
            Component::noop("text"),
            Props::new().arg("Hello"),
        ))
        .serialize()
        .unwrap();
        let body = json!({"__body__": [valid, {"__type__": "ComponentParser"}]});
        assert!(Schema::deserialize(&body, &components, true).is_err());
        let schema = Schema::deserialize(&body, &components, false).unwrap();
        assert_eq!(schema.body().len(), 1);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_lenient_skip_is_logged() {
        let components: HashMap<String, Component> = HashMap::new();
        let data = json!({"__type__": "Sparkline"});

        assert!(Element::deserialize(&data, &components, false).unwrap().is_none());
        assert!(logs_contain("Skipping serialized element of unknown type"));
    }

    #[test]
    fn test_callable_round_trip() {
        let divider = Component::noop("divider");
        let mut components = HashMap::new();
        components.insert("divider".to_string(), divider.clone());

        let data = Element::from(divider).serialize().unwrap();
        let restored = Element::deserialize(&data, &components, true).unwrap().unwrap();
        assert!(matches!(restored, Element::Callable(ref c) if c.name() == "divider"));
    }
}

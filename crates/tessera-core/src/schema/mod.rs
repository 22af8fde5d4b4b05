//! Layered component trees.
//!
//! A [`Schema`] owns one body [`Layer`]. Every element lives in the body;
//! named sub-layers are body entries too, and the schema keeps an index from
//! [`LayerId`] to their position so they can be addressed directly.
//!
//! # Serialization
//!
//! A schema serializes to its body layer: `{"<body id>": [element, ...]}`,
//! with an optional `"__order__"` list. Each element carries a `__type__`
//! discriminator (`ComponentParser`, `LayoutParser`, `Layer`, `Callable`) that
//! drives deserialization.

mod element;
mod ids;
mod layer;

pub use element::Element;
pub use ids::{EntryId, LayerId};
pub use layer::Layer;

use crate::component::Component;
use crate::error::{RenderResult, SchemaError, SchemaResult};
use crate::parser::{ComponentParser, LayoutParser};
use crate::registry::ComponentMap;
use crate::render::RenderOutcome;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Default body layer name.
pub const BODY: &str = "__body__";

/// A body layer plus directly addressable sub-layers.
#[derive(Debug, Clone)]
pub struct Schema {
    body: Layer,
    layers: HashMap<LayerId, usize>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(BODY)
    }
}

impl Schema {
    /// Empty schema whose body layer is called `body_name`.
    pub fn new(body_name: impl Into<LayerId>) -> Self {
        Self {
            body: Layer::new(body_name),
            layers: HashMap::new(),
        }
    }

    /// Adopt an existing layer as the body, indexing its nested layers.
    pub fn from_body(body: Layer) -> Self {
        let layers = body
            .elements()
            .iter()
            .enumerate()
            .filter_map(|(position, element)| {
                element.as_layer().map(|layer| (layer.id().clone(), position))
            })
            .collect();
        Self { body, layers }
    }

    /// The body layer.
    pub fn body(&self) -> &Layer {
        &self.body
    }

    /// Mutable body layer.
    pub fn body_mut(&mut self) -> &mut Layer {
        &mut self.body
    }

    /// Id of the body layer.
    pub fn body_id(&self) -> &LayerId {
        self.body.id()
    }

    /// Rename the body layer.
    pub fn set_body_name(&mut self, name: impl Into<LayerId>) -> &mut Self {
        self.body.set_id(name);
        self
    }

    /// Add a sub-layer, appended to the body. Returns the existing layer if the id is taken.
    pub fn add_layer(&mut self, id: impl Into<LayerId>) -> &mut Layer {
        let id = id.into();
        // The index goes stale if the body was edited through `body_mut`.
        let indexed = self.layers.get(&id).copied().filter(|&position| {
            matches!(
                self.body.get(&EntryId::Position(position)),
                Some(Element::Layer(layer)) if layer.id() == &id
            )
        });
        let position = match indexed {
            Some(position) => position,
            None => {
                let position = self.body.len();
                self.body.add_layer(Layer::new(id.clone()));
                self.layers.insert(id, position);
                position
            }
        };
        match self.body.get_mut(&EntryId::Position(position)) {
            Some(Element::Layer(layer)) => layer,
            _ => unreachable!("layer index points at a layer"),
        }
    }

    /// Append a component parser to the body.
    pub fn add_component(&mut self, parser: ComponentParser) -> &mut ComponentParser {
        self.body.add_component(parser)
    }

    /// Append a layout parser to the body.
    pub fn add_container(&mut self, parser: LayoutParser) -> &mut LayoutParser {
        self.body.add_container(parser)
    }

    /// Append a raw callable to the body.
    pub fn add_function(&mut self, component: Component) -> &mut Self {
        self.body.add_function(component);
        self
    }

    /// Append a component parser to a sub-layer, creating the layer if needed.
    pub fn add_to_layer(
        &mut self,
        id: impl Into<LayerId>,
        parser: ComponentParser,
    ) -> &mut ComponentParser {
        self.add_layer(id).add_component(parser)
    }

    /// Append a layout parser to a sub-layer, creating the layer if needed.
    pub fn add_container_to_layer(
        &mut self,
        id: impl Into<LayerId>,
        parser: LayoutParser,
    ) -> &mut LayoutParser {
        self.add_layer(id).add_container(parser)
    }

    /// Sub-layer lookup.
    pub fn layer(&self, id: &LayerId) -> SchemaResult<&Layer> {
        self.layers
            .get(id)
            .and_then(|&position| self.body.get(&EntryId::Position(position)))
            .and_then(Element::as_layer)
            .filter(|layer| layer.id() == id)
            .ok_or_else(|| SchemaError::UnknownLayer(id.clone()))
    }

    /// Mutable sub-layer lookup.
    pub fn layer_mut(&mut self, id: &LayerId) -> SchemaResult<&mut Layer> {
        self.layers
            .get(id)
            .copied()
            .and_then(|position| self.body.get_mut(&EntryId::Position(position)))
            .and_then(Element::as_layer_mut)
            .filter(|layer| layer.id() == id)
            .ok_or_else(|| SchemaError::UnknownLayer(id.clone()))
    }

    /// Whether a sub-layer with this id exists.
    pub fn contains_layer(&self, id: &LayerId) -> bool {
        self.layer(id).is_ok()
    }

    /// Ids of the sub-layers, in body order.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        let mut ids: Vec<_> = self.layers.iter().collect();
        ids.sort_by_key(|&(_, position)| *position);
        ids.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Number of sub-layers (the body is not counted).
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the schema has no sub-layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Drop every element and sub-layer.
    pub fn clear(&mut self) {
        self.body.clear();
        self.layers.clear();
    }

    /// Render the whole body.
    pub fn render(&self) -> RenderResult<Vec<RenderOutcome>> {
        self.body.render()
    }

    /// Render one body entry.
    pub fn render_entry(&self, entry: &EntryId) -> RenderResult<Vec<RenderOutcome>> {
        self.body.render_entry(entry)
    }

    /// Serialize the body layer.
    pub fn serialize(&self) -> SchemaResult<JsonValue> {
        self.body.serialize()
    }

    /// Rebuild a schema from [`Schema::serialize`] output.
    ///
    /// An empty object yields an empty schema with the default body name.
    pub fn deserialize(
        data: &JsonValue,
        components: &dyn ComponentMap,
        strict: bool,
    ) -> SchemaResult<Self> {
        if data.as_object().is_some_and(|map| map.is_empty()) {
            return Ok(Self::default());
        }
        Ok(Self::from_body(Layer::deserialize(data, components, strict)?))
    }
}

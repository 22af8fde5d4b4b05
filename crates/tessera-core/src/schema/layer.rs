//! Ordered groups of renderable entries.

use super::element::Element;
use super::ids::{EntryId, LayerId};
use crate::component::Component;
use crate::error::{RenderResult, SchemaError, SchemaResult};
use crate::parser::{ComponentParser, LayoutParser};
use crate::registry::ComponentMap;
use crate::render::RenderOutcome;
use crate::serial::ORDER_KEY;
use serde_json::{Map, Value as JsonValue};

/// An ordered list of entries, optionally re-ordered explicitly.
///
/// Iteration follows `order` when it is non-empty and insertion order
/// otherwise. Entries are addressed by [`EntryId`].
#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    elements: Vec<Element>,
    order: Vec<EntryId>,
}

impl Layer {
    /// Empty layer with the given id.
    pub fn new(id: impl Into<LayerId>) -> Self {
        Self {
            id: id.into(),
            elements: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Empty layer with a generated id.
    pub fn anonymous() -> Self {
        Self::new(LayerId::generate())
    }

    /// Layer id.
    pub fn id(&self) -> &LayerId {
        &self.id
    }

    /// Rename the layer.
    pub fn set_id(&mut self, id: impl Into<LayerId>) -> &mut Self {
        self.id = id.into();
        self
    }

    /// Explicit order, empty when natural order applies.
    pub fn order(&self) -> &[EntryId] {
        &self.order
    }

    /// Override the iteration order.
    pub fn set_order(&mut self, order: impl IntoIterator<Item = impl Into<EntryId>>) -> &mut Self {
        self.order = order.into_iter().map(Into::into).collect();
        self
    }

    /// The order rendering follows: explicit if set, positions otherwise.
    pub fn effective_order(&self) -> Vec<EntryId> {
        if self.order.is_empty() {
            (0..self.elements.len()).map(EntryId::Position).collect()
        } else {
            self.order.clone()
        }
    }

    /// Append any element.
    pub fn push(&mut self, element: impl Into<Element>) -> &mut Element {
        let position = self.elements.len();
        self.elements.push(element.into());
        &mut self.elements[position]
    }

    /// Append a component parser and return it for further configuration.
    pub fn add_component(&mut self, parser: ComponentParser) -> &mut ComponentParser {
        match self.push(parser) {
            Element::Component(parser) => parser,
            _ => unreachable!("pushed a component parser"),
        }
    }

    /// Append a layout parser and return it for further configuration.
    pub fn add_container(&mut self, parser: LayoutParser) -> &mut LayoutParser {
        match self.push(parser) {
            Element::Layout(parser) => parser,
            _ => unreachable!("pushed a layout parser"),
        }
    }

    /// Append a nested layer.
    pub fn add_layer(&mut self, layer: Layer) -> &mut Layer {
        match self.push(layer) {
            Element::Layer(layer) => layer,
            _ => unreachable!("pushed a layer"),
        }
    }

    /// Append a raw callable; it is invoked with empty props.
    pub fn add_function(&mut self, component: Component) -> &mut Self {
        self.elements.push(Element::Callable(component));
        self
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the layer has no entries.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    /// Position of the entry addressed by `entry`.
    pub fn position(&self, entry: &EntryId) -> Option<usize> {
        match entry {
            EntryId::Position(p) if *p < self.elements.len() => Some(*p),
            EntryId::Position(_) => None,
            EntryId::Key(key) => self.elements.iter().position(|el| el.matches(key)),
        }
    }

    /// Entry lookup by position or key.
    pub fn get(&self, entry: &EntryId) -> Option<&Element> {
        let position = self.position(entry)?;
        self.elements.get(position)
    }

    /// Mutable entry lookup by position or key.
    pub fn get_mut(&mut self, entry: &EntryId) -> Option<&mut Element> {
        let position = self.position(entry)?;
        self.elements.get_mut(position)
    }

    /// Entry lookup that reports a missing entry as an error.
    pub fn entry(&self, entry: &EntryId) -> SchemaResult<&Element> {
        self.get(entry).ok_or_else(|| SchemaError::UnknownEntry {
            layer: self.id.clone(),
            entry: entry.clone(),
        })
    }

    /// Replace the entry at `position`, returning the old one.
    pub fn replace(&mut self, position: usize, element: impl Into<Element>) -> SchemaResult<Element> {
        let slot = self
            .elements
            .get_mut(position)
            .ok_or_else(|| SchemaError::UnknownEntry {
                layer: self.id.clone(),
                entry: EntryId::Position(position),
            })?;
        Ok(std::mem::replace(slot, element.into()))
    }

    /// Drop every entry and the explicit order.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.order.clear();
    }

    pub(crate) fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Render every entry in effective order.
    pub fn render(&self) -> RenderResult<Vec<RenderOutcome>> {
        let mut outcomes = Vec::with_capacity(self.elements.len());
        for entry in self.effective_order() {
            outcomes.extend(self.entry(&entry)?.render()?);
        }
        Ok(outcomes)
    }

    /// Render only the addressed entry.
    pub fn render_entry(&self, entry: &EntryId) -> RenderResult<Vec<RenderOutcome>> {
        self.entry(entry)?.render()
    }

    /// Serialize as `{id: [element, ...]}`, plus `__order__` when set.
    pub fn serialize(&self) -> SchemaResult<JsonValue> {
        let elements = self
            .elements
            .iter()
            .map(Element::serialize)
            .collect::<SchemaResult<Vec<_>>>()?;

        let mut map = Map::new();
        map.insert(self.id.to_string(), JsonValue::Array(elements));
        if !self.order.is_empty() {
            map.insert(ORDER_KEY.to_string(), serde_json::to_value(&self.order)?);
        }
        Ok(JsonValue::Object(map))
    }

    /// Rebuild a layer from [`Layer::serialize`] output.
    pub fn deserialize(
        data: &JsonValue,
        components: &dyn ComponentMap,
        strict: bool,
    ) -> SchemaResult<Self> {
        let map = data
            .as_object()
            .ok_or_else(|| SchemaError::malformed("serialized layer must be an object"))?;

        let mut ids = map.keys().filter(|k| k.as_str() != ORDER_KEY);
        let key = ids
            .next()
            .ok_or_else(|| SchemaError::malformed("serialized layer has no id"))?;
        if ids.next().is_some() {
            return Err(SchemaError::malformed("serialized layer has more than one id"));
        }

        let items = map[key]
            .as_array()
            .ok_or_else(|| SchemaError::malformed(format!("layer '{key}' must hold a list")))?;

        let mut layer = Layer::new(LayerId::from_key(key));
        for item in items {
            if let Some(element) = Element::deserialize(item, components, strict)? {
                layer.elements.push(element);
            }
        }
        if let Some(order) = map.get(ORDER_KEY) {
            layer.order = serde_json::from_value(order.clone())
                .map_err(|e| SchemaError::malformed(format!("__order__: {e}")))?;
        }
        Ok(layer)
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

//! Name-to-component resolution for deserialization.
//!
//! Serialized trees only carry component names. A [`ComponentMap`] turns
//! those names back into callables. Two implementations ship here:
//!
//! - a plain `HashMap<String, Component>`
//! - [`Standard`], a collection of [`Representation`]s that also carry the
//!   default props and parser flags a component is usually declared with
//!
//! A `Standard` is an ordinary value: build it, then pass it to whatever
//! needs it.

use crate::component::Component;
use crate::parser::{ComponentParser, LayoutParser, Parser};
use crate::props::Props;
use std::collections::HashMap;
use tracing::debug;

/// Resolves serialized component names.
pub trait ComponentMap {
    /// The component registered under `name`, if any.
    fn resolve(&self, name: &str) -> Option<Component>;
}

impl ComponentMap for HashMap<String, Component> {
    fn resolve(&self, name: &str) -> Option<Component> {
        self.get(name).cloned()
    }
}

/// Flags a representation applies to new parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserDefaults {
    pub stateful: bool,
    pub fatal: bool,
    pub strict: bool,
    pub column_based: bool,
}

/// The usual way a host primitive is declared.
#[derive(Debug, Clone)]
pub struct Representation {
    name: String,
    component: Component,
    default_props: Props,
    stateful: bool,
    fatal: bool,
    strict: bool,
    column_based: bool,
}

impl Representation {
    /// Representation named after its component, with default flags.
    pub fn new(component: Component) -> Self {
        Self {
            name: component.name().to_string(),
            component,
            default_props: Props::new(),
            stateful: false,
            fatal: false,
            strict: true,
            column_based: false,
        }
    }

    /// Set the props used when none are given.
    pub fn with_default_props(mut self, props: Props) -> Self {
        self.default_props = props;
        self
    }

    /// Mark as stateful.
    pub fn with_stateful(mut self, stateful: bool) -> Self {
        self.stateful = stateful;
        self
    }

    /// Mark as fatal.
    pub fn with_fatal(mut self, fatal: bool) -> Self {
        self.fatal = fatal;
        self
    }

    /// Mark as strict.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Mark as a column-based container.
    pub fn with_column_based(mut self, column_based: bool) -> Self {
        self.column_based = column_based;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_props(&self) -> &Props {
        &self.default_props
    }

    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_column_based(&self) -> bool {
        self.column_based
    }

    /// Flags for a parser built from this representation.
    pub fn parser_defaults(&self) -> ParserDefaults {
        ParserDefaults {
            stateful: self.stateful,
            fatal: self.fatal,
            strict: self.strict,
            column_based: self.column_based,
        }
    }

    /// The callable behind this representation.
    pub fn deserialize(&self) -> Component {
        self.component.clone()
    }

    /// Whether `component` is the callable this representation wraps.
    pub fn represents(&self, component: &Component) -> bool {
        self.component.same_callable(component)
    }
}

/// A set of representations plus replacement bindings.
///
/// A binding redirects lookups for a name to a different representation,
/// which lets one standard override how another's components are declared.
#[derive(Debug, Clone, Default)]
pub struct Standard {
    representations: Vec<Representation>,
    bindings: HashMap<String, Representation>,
}

impl Standard {
    /// Empty standard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a representation.
    pub fn add_representation(&mut self, representation: Representation) -> &mut Self {
        self.representations.push(representation);
        self
    }

    /// Builder form of [`Standard::add_representation`].
    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representations.push(representation);
        self
    }

    /// Redirect lookups of `name` to `replacement`.
    pub fn bind(&mut self, name: impl Into<String>, replacement: Representation) -> &mut Self {
        self.bindings.insert(name.into(), replacement);
        self
    }

    /// Representation registered under `name`, honoring bindings.
    pub fn get_similar(&self, name: &str) -> Option<&Representation> {
        let found = self.representations.iter().find(|r| r.name() == name)?;
        Some(self.binding_for(found))
    }

    /// Representation wrapping `component`, honoring bindings.
    pub fn get_similar_component(&self, component: &Component) -> Option<&Representation> {
        let found = self.representations.iter().find(|r| r.represents(component))?;
        Some(self.binding_for(found))
    }

    fn binding_for<'a>(&'a self, found: &'a Representation) -> &'a Representation {
        match self.bindings.get(found.name()) {
            Some(bound) => {
                debug!(from = %found.name(), to = %bound.name(), "Using bound representation");
                bound
            }
            None => found,
        }
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.representations.iter().map(Representation::name).collect()
    }

    /// Number of representations.
    pub fn len(&self) -> usize {
        self.representations.len()
    }

    /// Whether no representation is registered.
    pub fn is_empty(&self) -> bool {
        self.representations.is_empty()
    }

    /// A component parser pre-configured from the representation of `name`.
    ///
    /// Empty `props` fall back to the representation's defaults.
    pub fn component_parser(&self, name: &str, props: Props) -> Option<ComponentParser> {
        let representation = self.get_similar(name)?;
        let props = if props.is_empty() {
            representation.default_props().clone()
        } else {
            props
        };
        let defaults = representation.parser_defaults();
        let mut parser = ComponentParser::new(representation.deserialize(), props);
        parser
            .set_stateful(defaults.stateful)
            .set_fatal(defaults.fatal)
            .set_strict(defaults.strict);
        Some(parser)
    }

    /// A layout parser pre-configured from the representation of `name`.
    pub fn layout_parser(&self, name: &str, props: Props) -> Option<LayoutParser> {
        let representation = self.get_similar(name)?;
        let props = if props.is_empty() {
            representation.default_props().clone()
        } else {
            props
        };
        let defaults = representation.parser_defaults();
        let mut parser = LayoutParser::new(representation.deserialize(), props);
        parser.set_fatal(defaults.fatal);
        parser.set_column_based(defaults.column_based);
        Some(parser)
    }
}

impl ComponentMap for Standard {
    fn resolve(&self, name: &str) -> Option<Component> {
        self.get_similar(name).map(Representation::deserialize)
    }
}

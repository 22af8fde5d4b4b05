//! Declaration-time builders that materialize renderables.
//!
//! A parser stores a component, its props, and behavior flags. `parse()`
//! builds a fresh [`Renderable`] every time it is called; layers keep the
//! parser, not the renderable, so each rerun starts from clean state.
//!
//! # Autoconfig
//!
//! With `autoconfig` on (the default) the flags stored on the parser win over
//! the [`ParseOptions`] passed to [`Parser::parse_with`]. With it off, the
//! options win.
//!
//! # Serialized form
//!
//! ```json
//! {
//!   "__base__":   { "__component__": "button", "__args__": {...}, "__type__": "Stateful", ... },
//!   "__parser__": { "stateful": true, "fatal": false, "strict": true, "autoconfig": true },
//!   "__type__":   "ComponentParser"
//! }
//! ```

mod component;
mod layout;

pub use component::ComponentParser;
pub use layout::{LayoutParser, CHILDREN_BODY};

use crate::component::{Component, EffectFn, ErrorHandlerFn};
use crate::error::{RenderResult, SchemaResult};
use crate::props::Props;
use crate::render::{RenderOutcome, Renderable};
use crate::serial::ParserFlags;
use serde_json::Value as JsonValue;
use std::fmt;

/// Parse-time configuration.
#[derive(Clone)]
pub struct ParseOptions {
    /// Produce a stateful renderable
    pub stateful: bool,
    /// Unrecovered failures propagate
    pub fatal: bool,
    /// Stateful renderables require a key
    pub strict: bool,
    /// Error handler to install
    pub errhandler: Option<ErrorHandlerFn>,
    /// Containers render one child per column
    pub column_based: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            stateful: false,
            fatal: true,
            strict: true,
            errhandler: None,
            column_based: false,
        }
    }
}

impl ParseOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `stateful`.
    pub fn stateful(mut self, stateful: bool) -> Self {
        self.stateful = stateful;
        self
    }

    /// Set `fatal`.
    pub fn fatal(mut self, fatal: bool) -> Self {
        self.fatal = fatal;
        self
    }

    /// Set `strict`.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the error handler.
    pub fn errhandler(mut self, handler: ErrorHandlerFn) -> Self {
        self.errhandler = Some(handler);
        self
    }

    /// Set `column_based`.
    pub fn column_based(mut self, column_based: bool) -> Self {
        self.column_based = column_based;
        self
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("stateful", &self.stateful)
            .field("fatal", &self.fatal)
            .field("strict", &self.strict)
            .field("errhandler", &self.errhandler.is_some())
            .field("column_based", &self.column_based)
            .finish()
    }
}

/// State shared by every parser.
#[derive(Clone)]
pub struct ParserCore {
    component: Component,
    props: Props,
    stateful: bool,
    fatal: bool,
    strict: bool,
    autoconfig: bool,
    errhandler: Option<ErrorHandlerFn>,
    effects: Vec<EffectFn>,
}

impl ParserCore {
    /// Wrap a component with default flags.
    pub fn new(component: Component, props: Props) -> Self {
        Self {
            component,
            props,
            stateful: false,
            fatal: false,
            strict: true,
            autoconfig: true,
            errhandler: None,
            effects: Vec::new(),
        }
    }

    /// Wrapped component.
    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Stored props.
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Stored `stateful` flag.
    pub fn stateful(&self) -> bool {
        self.stateful
    }

    /// Stored `fatal` flag.
    pub fn fatal(&self) -> bool {
        self.fatal
    }

    /// Stored `strict` flag.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Whether stored flags override parse-time options.
    pub fn autoconfig(&self) -> bool {
        self.autoconfig
    }

    /// Stored error handler.
    pub fn errhandler(&self) -> Option<&ErrorHandlerFn> {
        self.errhandler.as_ref()
    }

    /// Stored effects.
    pub fn effects(&self) -> &[EffectFn] {
        &self.effects
    }

    /// Apply autoconfig: stored flags replace `options` when enabled.
    pub fn resolve(&self, options: ParseOptions) -> ParseOptions {
        if !self.autoconfig {
            return options;
        }
        ParseOptions {
            stateful: self.stateful,
            fatal: self.fatal,
            strict: self.strict,
            errhandler: self.errhandler.clone(),
            column_based: options.column_based,
        }
    }

    /// Install the shared render policy on a freshly built renderable.
    pub(crate) fn configure(&self, renderable: &mut Renderable, options: &ParseOptions) {
        renderable
            .set_base_component(self.component.clone())
            .set_errhandler(options.errhandler.clone())
            .set_fatal(options.fatal)
            .add_effects(self.effects.iter().cloned());
    }

    pub(crate) fn flags(&self, column_based: Option<bool>) -> ParserFlags {
        ParserFlags {
            stateful: self.stateful,
            fatal: self.fatal,
            strict: self.strict,
            autoconfig: self.autoconfig,
            column_based,
        }
    }

    pub(crate) fn apply_flags(&mut self, flags: &ParserFlags) {
        self.stateful = flags.stateful;
        self.fatal = flags.fatal;
        self.strict = flags.strict;
        self.autoconfig = flags.autoconfig;
    }
}

impl fmt::Debug for ParserCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserCore")
            .field("component", &self.component.name())
            .field("props", &self.props)
            .field("stateful", &self.stateful)
            .field("fatal", &self.fatal)
            .field("strict", &self.strict)
            .field("autoconfig", &self.autoconfig)
            .field("errhandler", &self.errhandler.is_some())
            .field("effects", &self.effects.len())
            .finish()
    }
}

/// Common parser behavior: chained configuration, parsing, and invocation.
pub trait Parser {
    /// Discriminator written to `__type__`.
    const TYPE_NAME: &'static str;

    /// Shared parser state.
    fn core(&self) -> &ParserCore;

    /// Mutable shared parser state.
    fn core_mut(&mut self) -> &mut ParserCore;

    /// Materialize a renderable.
    fn parse_with(&self, options: ParseOptions) -> Renderable;

    /// Serialize to the three-namespace form.
    fn serialize(&self) -> SchemaResult<JsonValue>;

    /// Materialize with default options.
    fn parse(&self) -> Renderable {
        self.parse_with(ParseOptions::default())
    }

    /// Stored props.
    fn props(&self) -> &Props {
        &self.core().props
    }

    /// Wrapped component.
    fn component(&self) -> &Component {
        &self.core().component
    }

    /// Set the stored `stateful` flag.
    fn set_stateful(&mut self, stateful: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.core_mut().stateful = stateful;
        self
    }

    /// Set the stored `fatal` flag.
    fn set_fatal(&mut self, fatal: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.core_mut().fatal = fatal;
        self
    }

    /// Set the stored `strict` flag.
    fn set_strict(&mut self, strict: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.core_mut().strict = strict;
        self
    }

    /// Enable or disable autoconfig.
    fn set_autoconfig(&mut self, autoconfig: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.core_mut().autoconfig = autoconfig;
        self
    }

    /// Set the stored error handler.
    fn set_errhandler(&mut self, handler: ErrorHandlerFn) -> &mut Self
    where
        Self: Sized,
    {
        self.core_mut().errhandler = Some(handler);
        self
    }

    /// Append an effect.
    fn add_effect(&mut self, effect: EffectFn) -> &mut Self
    where
        Self: Sized,
    {
        self.core_mut().effects.push(effect);
        self
    }

    /// Append several effects.
    fn add_effects(&mut self, effects: impl IntoIterator<Item = EffectFn>) -> &mut Self
    where
        Self: Sized,
    {
        self.core_mut().effects.extend(effects);
        self
    }

    /// Parse, then render with the stored props.
    fn call(&self) -> RenderResult<RenderOutcome> {
        self.parse().call()
    }

    /// Parse, then render with `props` (stored props when empty).
    fn call_with(&self, props: Props) -> RenderResult<RenderOutcome> {
        self.parse().call_with(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::error_handler;

    #[test]
    fn test_core_defaults() {
        let core = ParserCore::new(Component::noop("text"), Props::new());
        assert!(!core.stateful());
        assert!(!core.fatal());
        assert!(core.strict());
        assert!(core.autoconfig());
        assert!(core.errhandler().is_none());
    }

    #[test]
    fn test_resolve_with_autoconfig() {
        let core = ParserCore::new(Component::noop("text"), Props::new());
        let resolved = core.resolve(ParseOptions::new().fatal(true).stateful(true));
        assert!(!resolved.fatal);
        assert!(!resolved.stateful);
    }

    #[test]
    fn test_resolve_without_autoconfig() {
        let mut core = ParserCore::new(Component::noop("text"), Props::new());
        core.autoconfig = false;
        let resolved = core.resolve(
            ParseOptions::new()
                .fatal(true)
                .errhandler(error_handler(|_| true)),
        );
        assert!(resolved.fatal);
        assert!(resolved.errhandler.is_some());
    }

    #[test]
    fn test_parse_options_defaults() {
        let options = ParseOptions::default();
        assert!(!options.stateful);
        assert!(options.fatal);
        assert!(options.strict);
        assert!(!options.column_based);
    }
}

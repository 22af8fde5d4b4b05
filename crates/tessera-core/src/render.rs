//! Deferred invocation of a host primitive.
//!
//! A [`Renderable`] wraps one [`Component`] with its arguments and the policy
//! that decides what happens when the component fails:
//!
//! 1. The base component runs with the effective props (call-time props when
//!    non-empty, the stored ones otherwise).
//! 2. On a truthy result, every effect runs in order.
//! 3. A failure is first offered to the error handler. If the handler returns
//!    `true` the failure is suppressed; otherwise it becomes a
//!    [`NonRenderError`] marker carrying the `fatal` flag.
//!
//! Capabilities are plain fields: an optional [`StateBinding`] makes the
//! renderable stateful, an optional [`LayoutState`] makes it a container.

use crate::component::{Component, EffectFn, ErrorHandlerFn};
use crate::error::{RenderError, RenderResult, SchemaError, SchemaResult, StateError, StateResult};
use crate::layout::{self, ComponentParserFactory, LayoutState};
use crate::props::{Output, Props};
use crate::registry::ComponentMap;
use crate::schema::Schema;
use crate::serial::{resolve_component, BaseKind, BaseRecord};
use crate::state::{StateBinding, StateStore};
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::{debug, warn};

/// Core render configuration shared by every renderable.
#[derive(Clone)]
pub struct RenderState {
    /// Stored arguments
    pub props: Props,
    /// The wrapped primitive
    pub base: Option<Component>,
    /// Whether unrecovered failures propagate
    pub fatal: bool,
    /// Rendered at the top level of a canvas
    pub top_render: bool,
    /// Optional recovery hook
    pub errhandler: Option<ErrorHandlerFn>,
    /// Post-render effects, in order
    pub effects: Vec<EffectFn>,
}

impl RenderState {
    fn new(props: Props) -> Self {
        Self {
            props,
            base: None,
            fatal: false,
            top_render: false,
            errhandler: None,
            effects: Vec::new(),
        }
    }
}

impl fmt::Debug for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderState")
            .field("props", &self.props)
            .field("base", &self.base.as_ref().map(Component::name))
            .field("fatal", &self.fatal)
            .field("top_render", &self.top_render)
            .field("errhandler", &self.errhandler.is_some())
            .field("effects", &self.effects.len())
            .finish()
    }
}

/// Marker for a render failure that was not handled.
///
/// Its truthiness equals its `fatal` flag: layout code that checks outcomes
/// for truthiness treats fatal failures as a signal to propagate and
/// non-fatal ones as values to inspect.
#[derive(Debug)]
pub struct NonRenderError {
    error: anyhow::Error,
    fatal: bool,
    component: String,
}

impl NonRenderError {
    /// Wrap a failure.
    pub fn new(error: anyhow::Error, fatal: bool, component: impl Into<String>) -> Self {
        Self {
            error,
            fatal,
            component: component.into(),
        }
    }

    /// Whether the failure should propagate.
    pub fn was_fatal(&self) -> bool {
        self.fatal
    }

    /// Truthiness of the marker.
    pub fn is_truthy(&self) -> bool {
        self.fatal
    }

    /// The original failure.
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// Name of the component that failed.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Convert into a [`RenderError::Fatal`], regardless of the flag.
    pub fn into_error(self) -> RenderError {
        RenderError::fatal(self.component, self.error)
    }

    /// Re-raise when fatal; otherwise hand back the failure and its origin.
    pub fn evaluate(self) -> RenderResult<(anyhow::Error, String)> {
        if self.fatal {
            Err(self.into_error())
        } else {
            Ok((self.error, self.component))
        }
    }
}

impl fmt::Display for NonRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NonRenderError({}): {}", self.component, self.error)
    }
}

/// Result of invoking a renderable.
#[derive(Debug)]
pub enum RenderOutcome {
    /// The component ran; effects ran if the output was truthy
    Rendered(Output),
    /// The component failed and the error handler suppressed it
    Handled,
    /// The component failed and nothing handled it
    Failed(NonRenderError),
}

impl RenderOutcome {
    /// Truthiness, following the wrapped output or marker.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Rendered(output) => output.is_truthy(),
            Self::Handled => false,
            Self::Failed(marker) => marker.is_truthy(),
        }
    }

    /// The output, when rendering succeeded.
    pub fn output(&self) -> Option<&Output> {
        match self {
            Self::Rendered(output) => Some(output),
            _ => None,
        }
    }

    /// The marker, when rendering failed.
    pub fn failure(&self) -> Option<&NonRenderError> {
        match self {
            Self::Failed(marker) => Some(marker),
            _ => None,
        }
    }

    /// Turn a fatal marker into an error; pass everything else through.
    pub fn escalate(self) -> RenderResult<Self> {
        match self {
            Self::Failed(marker) if marker.was_fatal() => Err(marker.into_error()),
            other => Ok(other),
        }
    }
}

/// A deferred, configurable invocation of one host primitive.
#[derive(Debug, Clone)]
pub struct Renderable {
    state: RenderState,
    binding: Option<StateBinding>,
    layout: Option<LayoutState>,
}

impl Renderable {
    /// Plain display renderable.
    pub fn new(props: Props) -> Self {
        Self {
            state: RenderState::new(props),
            binding: None,
            layout: None,
        }
    }

    /// Renderable bound to the state store; the key comes from the `key` kwarg.
    pub fn stateful(props: Props) -> Self {
        let binding = StateBinding::from_props(&props);
        Self {
            state: RenderState::new(props),
            binding: Some(binding),
            layout: None,
        }
    }

    /// Renderable that lays out a nested schema.
    pub fn container(props: Props) -> Self {
        Self {
            state: RenderState::new(props),
            binding: None,
            layout: Some(LayoutState::new(Schema::new(layout::CONTAINER_BODY))),
        }
    }

    pub(crate) fn with_layout(props: Props, layout: LayoutState) -> Self {
        Self {
            state: RenderState::new(props),
            binding: None,
            layout: Some(layout),
        }
    }

    /// Label used in errors and logs.
    pub fn name(&self) -> &str {
        self.state
            .base
            .as_ref()
            .map(Component::name)
            .unwrap_or("<unset>")
    }

    /// Render configuration.
    pub fn render_state(&self) -> &RenderState {
        &self.state
    }

    /// Stored props.
    pub fn props(&self) -> &Props {
        &self.state.props
    }

    /// The wrapped primitive, if set.
    pub fn base_component(&self) -> Option<&Component> {
        self.state.base.as_ref()
    }

    /// Set the wrapped primitive.
    pub fn set_base_component(&mut self, component: Component) -> &mut Self {
        self.state.base = Some(component);
        self
    }

    /// Set the fatal flag.
    pub fn set_fatal(&mut self, fatal: bool) -> &mut Self {
        self.state.fatal = fatal;
        self
    }

    /// Mark as rendered at the top level.
    pub fn set_top_render(&mut self, top_render: bool) -> &mut Self {
        self.state.top_render = top_render;
        self
    }

    /// Replace the error handler.
    pub fn set_errhandler(&mut self, handler: Option<ErrorHandlerFn>) -> &mut Self {
        self.state.errhandler = handler;
        self
    }

    /// Append an effect.
    pub fn add_effect(&mut self, effect: EffectFn) -> &mut Self {
        self.state.effects.push(effect);
        self
    }

    /// Append several effects.
    pub fn add_effects(&mut self, effects: impl IntoIterator<Item = EffectFn>) -> &mut Self {
        self.state.effects.extend(effects);
        self
    }

    /// Fatal flag.
    pub fn is_fatal(&self) -> bool {
        self.state.fatal
    }

    /// Top-render flag.
    pub fn is_top_render(&self) -> bool {
        self.state.top_render
    }

    /// Whether this renderable carries a state binding.
    pub fn is_stateful(&self) -> bool {
        self.binding.is_some()
    }

    /// Whether this renderable lays out a schema.
    pub fn is_container(&self) -> bool {
        self.layout.is_some()
    }

    /// State binding, for stateful renderables.
    pub fn binding(&self) -> Option<&StateBinding> {
        self.binding.as_ref()
    }

    /// Mutable state binding, for stateful renderables.
    pub fn binding_mut(&mut self) -> Option<&mut StateBinding> {
        self.binding.as_mut()
    }

    /// Layout capability, for containers.
    pub fn layout(&self) -> Option<&LayoutState> {
        self.layout.as_ref()
    }

    /// Mutable layout capability, for containers.
    pub fn layout_mut(&mut self) -> Option<&mut LayoutState> {
        self.layout.as_mut()
    }

    /// Set the column layout mode; no-op for non-containers.
    pub fn set_column_based(&mut self, column_based: bool) -> &mut Self {
        if let Some(layout) = self.layout.as_mut() {
            layout.set_column_based(column_based);
        }
        self
    }

    /// Replace the factory used by container `add_component`; no-op for non-containers.
    pub fn set_component_parser(&mut self, factory: ComponentParserFactory) -> &mut Self {
        if let Some(layout) = self.layout.as_mut() {
            layout.set_component_parser(factory);
        }
        self
    }

    /// Read the bound value. Non-stateful renderables have none.
    pub fn track_state(&self, store: &dyn StateStore) -> StateResult<Option<JsonValue>> {
        match &self.binding {
            Some(binding) => binding.track_state(store, self.name()),
            None => Ok(None),
        }
    }

    /// Write the bound value.
    pub fn set_state(&self, store: &dyn StateStore, value: JsonValue) -> StateResult<()> {
        match &self.binding {
            Some(binding) => binding.set_state(store, self.name(), value),
            None => Err(StateError::NotEditable(self.name().to_string())),
        }
    }

    /// Render with the stored props.
    pub fn call(&self) -> RenderResult<RenderOutcome> {
        self.call_with(Props::new())
    }

    /// Render with `props` when non-empty, the stored props otherwise.
    ///
    /// Returns `Err` only for configuration problems. Component and effect
    /// failures come back as [`RenderOutcome::Handled`] or
    /// [`RenderOutcome::Failed`].
    pub fn call_with(&self, props: Props) -> RenderResult<RenderOutcome> {
        let base = self
            .state
            .base
            .as_ref()
            .ok_or_else(|| RenderError::MissingBaseComponent {
                renderable: self.name().to_string(),
            })?;
        let props = if props.is_empty() {
            &self.state.props
        } else {
            &props
        };

        if let Some(binding) = &self.binding {
            if binding.strict && props.key().is_none() && binding.key.is_none() {
                return Err(RenderError::MissingStateKey {
                    component: base.name().to_string(),
                });
            }
        }

        let rendered = match &self.layout {
            Some(layout) => layout.render(base, props),
            None => base.call(props),
        };
        Ok(self.settle(rendered))
    }

    fn settle(&self, rendered: anyhow::Result<Output>) -> RenderOutcome {
        match rendered {
            Ok(output) => {
                if output.is_truthy() {
                    if let Some(error) = self.apply_effects(&output) {
                        return RenderOutcome::Failed(self.marker(error));
                    }
                }
                RenderOutcome::Rendered(output)
            }
            Err(error) => {
                if self.handled(&error) {
                    debug!(component = %self.name(), error = %error, "Render error handled");
                    RenderOutcome::Handled
                } else {
                    RenderOutcome::Failed(self.marker(error))
                }
            }
        }
    }

    /// Run every effect; report the first failure the error handler did not take.
    fn apply_effects(&self, output: &Output) -> Option<anyhow::Error> {
        let mut unhandled = None;
        for effect in &self.state.effects {
            let Err(error) = effect(output) else {
                continue;
            };
            if self.handled(&error) {
                continue;
            }
            if unhandled.is_none() {
                unhandled = Some(error);
            } else {
                warn!(component = %self.name(), error = %error, "Additional effect failure");
            }
        }
        unhandled
    }

    fn handled(&self, error: &anyhow::Error) -> bool {
        self.state
            .errhandler
            .as_ref()
            .map(|handler| handler(error))
            .unwrap_or(false)
    }

    fn marker(&self, error: anyhow::Error) -> NonRenderError {
        NonRenderError::new(error, self.state.fatal, self.name())
    }

    /// Serialize the render state.
    pub fn serialize(&self) -> SchemaResult<JsonValue> {
        Ok(serde_json::to_value(self.to_record()?)?)
    }

    pub(crate) fn to_record(&self) -> SchemaResult<BaseRecord> {
        let component = self
            .state
            .base
            .as_ref()
            .ok_or(SchemaError::MissingField("__component__"))?;

        let kind = if self.layout.is_some() {
            BaseKind::Container
        } else if self.binding.is_some() {
            BaseKind::Stateful
        } else {
            BaseKind::Renderable
        };

        Ok(BaseRecord {
            component: component.name().to_string(),
            args: self.state.props.clone(),
            kind,
            fatal: self.state.fatal,
            top_render: self.state.top_render,
            key: self.binding.as_ref().and_then(|b| b.key.clone()),
            editable: self.binding.as_ref().map(|b| b.editable),
            strict: self.binding.as_ref().map(|b| b.strict),
            column_based: self.layout.as_ref().map(LayoutState::is_column_based),
            schema: match &self.layout {
                Some(layout) => Some(layout.schema().serialize()?),
                None => None,
            },
        })
    }

    /// Rebuild a renderable from [`Renderable::serialize`] output.
    pub fn deserialize(
        data: &JsonValue,
        components: &dyn ComponentMap,
        strict: bool,
    ) -> SchemaResult<Self> {
        let record: BaseRecord = serde_json::from_value(data.clone())
            .map_err(|e| SchemaError::malformed(format!("renderable: {e}")))?;
        Self::from_record(record, components, strict)
    }

    pub(crate) fn from_record(
        record: BaseRecord,
        components: &dyn ComponentMap,
        strict: bool,
    ) -> SchemaResult<Self> {
        let component = resolve_component(components, &record.component, strict)?;
        let mut renderable = match record.kind {
            BaseKind::Renderable => Self::new(record.args),
            BaseKind::Stateful => {
                let mut renderable = Self::stateful(record.args);
                if let Some(binding) = renderable.binding_mut() {
                    if let Some(key) = record.key {
                        binding.set_key(key);
                    }
                    binding
                        .set_editable(record.editable.unwrap_or(false))
                        .set_strict(record.strict.unwrap_or(true));
                }
                renderable
            }
            BaseKind::Container => {
                let schema = match &record.schema {
                    Some(data) => Schema::deserialize(data, components, strict)?,
                    None => Schema::new(layout::CONTAINER_BODY),
                };
                let mut layout = LayoutState::new(schema);
                layout.set_column_based(record.column_based.unwrap_or(false));
                Self::with_layout(record.args, layout)
            }
        };
        renderable
            .set_base_component(component)
            .set_fatal(record.fatal)
            .set_top_render(record.top_render);
        Ok(renderable)
    }
}

//! Top-level declarative surfaces: pages, fragments, and dialogs.
//!
//! A [`Canvas`] owns one [`Schema`] whose body is `"__body__"`. `start()`
//! renders it. Fragments and dialogs can be bound to a host primitive that
//! returns a [`Region`](crate::props::Region); the body then renders inside it.
//!
//! # Failure handling
//!
//! A fatal child failure reaching the canvas is first offered to the
//! `failhandler`. If the handler does not take it and `failsafe` is set, the
//! failure is logged and swallowed; otherwise it propagates to the host.

use crate::component::{Component, ErrorHandlerFn};
use crate::error::{RenderError, RenderResult, SchemaError, SchemaResult};
use crate::parser::{ComponentParser, LayoutParser, Parser};
use crate::props::{Output, Props, ScopeGuard};
use crate::registry::ComponentMap;
use crate::render::RenderOutcome;
use crate::schema::{Element, EntryId, Layer, LayerId, Schema, BODY};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use tessera_config::{CanvasConfig, DialogConfig, FragmentConfig, PageConfig};
use tracing::{debug, error};

/// Which surface a canvas draws on, with its pass-through settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasKind {
    /// Full page
    Page(PageConfig),
    /// Independently rerunnable section
    Fragment(FragmentConfig),
    /// Modal dialog
    Dialog(DialogConfig),
}

impl CanvasKind {
    /// Discriminator written to `__type__`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Page(_) => "Page",
            Self::Fragment(_) => "Fragment",
            Self::Dialog(_) => "Dialog",
        }
    }

    fn config_value(&self) -> SchemaResult<JsonValue> {
        Ok(match self {
            Self::Page(config) => serde_json::to_value(config)?,
            Self::Fragment(config) => serde_json::to_value(config)?,
            Self::Dialog(config) => serde_json::to_value(config)?,
        })
    }

    fn from_parts(kind: &str, config: JsonValue) -> SchemaResult<Self> {
        let malformed = |e: serde_json::Error| SchemaError::malformed(format!("__config__: {e}"));
        match kind {
            "Page" => Ok(Self::Page(serde_json::from_value(config).map_err(malformed)?)),
            "Fragment" => Ok(Self::Fragment(serde_json::from_value(config).map_err(malformed)?)),
            "Dialog" => Ok(Self::Dialog(serde_json::from_value(config).map_err(malformed)?)),
            other => Err(SchemaError::UnknownType(other.to_string())),
        }
    }

    /// Props handed to the host primitive of a fragment or dialog.
    fn host_props(&self) -> Props {
        match self {
            Self::Page(_) => Props::new(),
            Self::Fragment(config) => match config.run_every_ms {
                Some(ms) => Props::new().kwarg("run_every_ms", ms),
                None => Props::new(),
            },
            Self::Dialog(config) => Props::new()
                .kwarg("title", config.title.clone())
                .kwarg("width", config.width.as_str()),
        }
    }
}

/// A declarative surface holding one schema.
#[derive(Clone)]
pub struct Canvas {
    kind: CanvasKind,
    schema: Schema,
    failsafe: bool,
    strict: bool,
    failhandler: Option<ErrorHandlerFn>,
    host: Option<Component>,
}

impl Canvas {
    fn with_kind(kind: CanvasKind) -> Self {
        let defaults = CanvasConfig::default();
        Self {
            kind,
            schema: Schema::new(BODY),
            failsafe: defaults.failsafe,
            strict: defaults.strict,
            failhandler: None,
            host: None,
        }
    }

    /// Page canvas.
    pub fn page(config: PageConfig) -> Self {
        Self::with_kind(CanvasKind::Page(config))
    }

    /// Fragment canvas.
    pub fn fragment(config: FragmentConfig) -> Self {
        Self::with_kind(CanvasKind::Fragment(config))
    }

    /// Dialog canvas.
    pub fn dialog(config: DialogConfig) -> Self {
        Self::with_kind(CanvasKind::Dialog(config))
    }

    /// Apply failure settings from configuration.
    pub fn configure(&mut self, config: &CanvasConfig) -> &mut Self {
        self.failsafe = config.failsafe;
        self.strict = config.strict;
        self
    }

    pub fn kind(&self) -> &CanvasKind {
        &self.kind
    }

    pub fn is_failsafe(&self) -> bool {
        self.failsafe
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Keep rendering when a fatal failure reaches the canvas.
    pub fn set_failsafe(&mut self, failsafe: bool) -> &mut Self {
        self.failsafe = failsafe;
        self
    }

    /// Handler offered fatal failures before failsafe applies.
    pub fn set_failhandler(&mut self, handler: ErrorHandlerFn) -> &mut Self {
        self.failhandler = Some(handler);
        self
    }

    /// Strictness for new stateful components and for deserialization.
    pub fn set_strict(&mut self, strict: bool) -> &mut Self {
        self.strict = strict;
        self
    }

    /// Host primitive the body renders inside; must return a single region.
    pub fn set_host(&mut self, host: Component) -> &mut Self {
        self.host = Some(host);
        self
    }

    /// The canvas schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Body layer.
    pub fn body(&self) -> &Layer {
        self.schema.body()
    }

    /// Append a component; inherits the canvas strictness.
    pub fn add_component(&mut self, component: Component, props: Props) -> &mut ComponentParser {
        let strict = self.strict;
        let parser = self
            .schema
            .add_component(ComponentParser::new(component, props));
        parser.set_strict(strict);
        parser
    }

    /// Append a container.
    pub fn add_container(&mut self, container: Component, props: Props) -> &mut LayoutParser {
        self.schema
            .add_container(LayoutParser::new(container, props))
    }

    /// Append an already configured parser.
    pub fn add_parser(&mut self, parser: ComponentParser) -> &mut ComponentParser {
        self.schema.add_component(parser)
    }

    /// Add a sub-layer.
    pub fn add_layer(&mut self, id: impl Into<LayerId>) -> &mut Layer {
        self.schema.add_layer(id)
    }

    /// Append a component to a sub-layer, creating it if needed.
    pub fn add_to_layer(
        &mut self,
        id: impl Into<LayerId>,
        component: Component,
        props: Props,
    ) -> &mut ComponentParser {
        let strict = self.strict;
        let parser = self
            .schema
            .add_to_layer(id, ComponentParser::new(component, props));
        parser.set_strict(strict);
        parser
    }

    /// Append a raw callable, invoked with no arguments.
    pub fn add_function(&mut self, function: Component) -> &mut Self {
        self.schema.add_function(function);
        self
    }

    /// Body entry by position or key.
    pub fn get(&self, entry: impl Into<EntryId>) -> SchemaResult<&Element> {
        self.schema.body().entry(&entry.into())
    }

    /// Render the body.
    pub fn start(&self) -> RenderResult<Vec<RenderOutcome>> {
        debug!(canvas = self.kind.type_name(), entries = self.body().len(), "Starting canvas");
        match self.render_body() {
            Ok(outcomes) => Ok(outcomes),
            Err(err) => self.recover(err),
        }
    }

    fn render_body(&self) -> RenderResult<Vec<RenderOutcome>> {
        let Some(host) = &self.host else {
            return self.schema.render();
        };

        let output = host
            .call(&self.kind.host_props())
            .map_err(|source| RenderError::Callable {
                name: host.name().to_string(),
                source,
            })?;
        let Output::Region(region) = output else {
            return Err(RenderError::Layout {
                component: host.name().to_string(),
                expected: "a single region",
            });
        };
        let _scope = ScopeGuard::enter(region.as_ref());
        self.schema.render()
    }

    fn recover(&self, err: RenderError) -> RenderResult<Vec<RenderOutcome>> {
        let error = anyhow::Error::new(err);
        if let Some(handler) = &self.failhandler {
            if handler(&error) {
                debug!(canvas = self.kind.type_name(), error = %error, "Canvas failure handled");
                return Ok(vec![RenderOutcome::Handled]);
            }
        }
        if self.failsafe {
            error!(canvas = self.kind.type_name(), error = %error, "Render failed, continuing in failsafe mode");
            return Ok(Vec::new());
        }
        match error.downcast::<RenderError>() {
            Ok(err) => Err(err),
            Err(other) => Err(RenderError::fatal(self.kind.type_name(), other)),
        }
    }

    /// Serialize kind, settings, and schema.
    pub fn serialize(&self) -> SchemaResult<JsonValue> {
        Ok(json!({
            "__type__": self.kind.type_name(),
            "__config__": self.kind.config_value()?,
            "__canvas__": {"failsafe": self.failsafe, "strict": self.strict},
            "__schema__": self.schema.serialize()?,
        }))
    }

    /// Rebuild from [`Canvas::serialize`] output.
    ///
    /// Strictness comes from the serialized canvas settings.
    pub fn deserialize(data: &JsonValue, components: &dyn ComponentMap) -> SchemaResult<Self> {
        let kind = data
            .get("__type__")
            .and_then(JsonValue::as_str)
            .ok_or(SchemaError::MissingField("__type__"))?;
        let config = data.get("__config__").cloned().unwrap_or_else(|| json!({}));
        let settings: CanvasConfig = match data.get("__canvas__") {
            Some(settings) => serde_json::from_value(settings.clone())
                .map_err(|e| SchemaError::malformed(format!("__canvas__: {e}")))?,
            None => CanvasConfig::default(),
        };

        let mut canvas = Self::with_kind(CanvasKind::from_parts(kind, config)?);
        canvas.configure(&settings);
        if let Some(schema) = data.get("__schema__") {
            canvas.schema = Schema::deserialize(schema, components, settings.strict)?;
        }
        Ok(canvas)
    }
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("kind", &self.kind)
            .field("schema", &self.schema)
            .field("failsafe", &self.failsafe)
            .field("strict", &self.strict)
            .field("failhandler", &self.failhandler.is_some())
            .field("host", &self.host.as_ref().map(Component::name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::error_handler;
    use crate::props::Region;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tessera_config::DialogWidth;

    fn broken() -> Component {
        Component::new("broken", |_| Err(anyhow::anyhow!("boom")))
    }

    #[test]
    fn test_fatal_failure_propagates_by_default() {
        let mut page = Canvas::page(PageConfig::default());
        page.add_component(broken(), Props::new()).set_fatal(true);
        assert!(matches!(page.start().unwrap_err(), RenderError::Fatal { .. }));
    }

    #[test]
    fn test_failsafe_swallows_fatal_failure() {
        let mut page = Canvas::page(PageConfig::default());
        page.set_failsafe(true);
        page.add_component(broken(), Props::new()).set_fatal(true);
        assert!(page.start().unwrap().is_empty());
    }

    #[test]
    fn test_failhandler_sees_failure_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut page = Canvas::page(PageConfig::default());
        page.set_failhandler(error_handler(move |e| {
            sink.lock().push(e.to_string());
            true
        }));
        page.add_component(broken(), Props::new()).set_fatal(true);

        let outcomes = page.start().unwrap();
        assert!(matches!(outcomes.as_slice(), [RenderOutcome::Handled]));
        assert_eq!(
            *seen.lock(),
            vec!["Fatal render failure in 'broken': boom".to_string()]
        );
    }

    #[test]
    fn test_canvas_strict_applies_to_components() {
        let mut page = Canvas::page(PageConfig::default());
        page.set_strict(false);
        let parser = page.add_component(Component::noop("text_input"), Props::new());
        assert!(!parser.core().strict());
    }

    #[test]
    fn test_get_by_key() {
        let mut page = Canvas::page(PageConfig::default());
        page.add_component(Component::noop("text"), Props::new().with_key("title"));
        assert!(page.get("title").is_ok());
        assert!(matches!(
            page.get("missing").unwrap_err(),
            SchemaError::UnknownEntry { .. }
        ));
    }

    #[test]
    fn test_dialog_renders_inside_host_region() {
        struct Modal(Arc<Mutex<Vec<String>>>);
        impl Region for Modal {
            fn enter(&self) {
                self.0.lock().push("open".into());
            }
            fn exit(&self) {
                self.0.lock().push("close".into());
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let host_log = Arc::clone(&log);
        let host = Component::new("dialog", move |props| {
            host_log
                .lock()
                .push(format!("{} {}", props.kwargs["title"], props.kwargs["width"]));
            Ok(Output::Region(Arc::new(Modal(Arc::clone(&host_log)))))
        });
        let body_log = Arc::clone(&log);

        let mut dialog = Canvas::dialog(DialogConfig {
            title: "Confirm".into(),
            width: DialogWidth::Large,
        });
        dialog.set_host(host).add_function(Component::new("body", move |_| {
            body_log.lock().push("body".into());
            Ok(Output::Empty)
        }));

        dialog.start().unwrap();
        assert_eq!(
            *log.lock(),
            vec!["\"Confirm\" \"large\"", "open", "body", "close"]
        );
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut components = HashMap::new();
        components.insert("text".to_string(), Component::noop("text"));

        let mut page = Canvas::page(PageConfig {
            title: "Dashboard".into(),
            ..PageConfig::default()
        });
        page.set_failsafe(true);
        page.add_component(components["text"].clone(), Props::new().arg("hello"));
        page.add_to_layer("side", components["text"].clone(), Props::new().arg("aside"));

        let data = page.serialize().unwrap();
        let restored = Canvas::deserialize(&data, &components).unwrap();
        assert!(restored.is_failsafe());
        assert_eq!(restored.kind(), page.kind());
        assert_eq!(restored.schema().layer_ids(), vec![LayerId::from("side")]);
        assert_eq!(restored.serialize().unwrap(), data);
    }
}

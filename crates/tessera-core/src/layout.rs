//! Container capability: a nested schema rendered inside host regions.
//!
//! Host containers come in two calling conventions:
//!
//! - **Column-based** primitives are called once with the column count and
//!   return one region per column ([`Output::Regions`]). Body entry `k` renders
//!   inside region `k`.
//! - **Row-based** primitives return a single region ([`Output::Region`]). The
//!   whole body renders inside it, in document order.
//!
//! Regions are entered through [`ScopeGuard`], so they are exited even when a
//! child fails.

use crate::component::Component;
use crate::error::RenderError;
use crate::parser::ComponentParser;
use crate::props::{Output, Props, ScopeGuard};
use crate::schema::{Layer, LayerId, Schema};
use tracing::debug;

/// Body layer name for containers built directly.
pub const CONTAINER_BODY: &str = "__container__";

/// Builds the parser that wraps components added to a container.
pub type ComponentParserFactory = fn(Component, Props) -> ComponentParser;

/// Layout state carried by container renderables.
#[derive(Debug, Clone)]
pub struct LayoutState {
    schema: Schema,
    column_based: bool,
    component_parser: ComponentParserFactory,
}

impl LayoutState {
    /// Wrap a schema; row-based by default.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            column_based: false,
            component_parser: ComponentParser::new,
        }
    }

    /// The nested schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Mutable nested schema.
    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    /// Whether children render one per column.
    pub fn is_column_based(&self) -> bool {
        self.column_based
    }

    /// Switch between column and row layout.
    pub fn set_column_based(&mut self, column_based: bool) -> &mut Self {
        self.column_based = column_based;
        self
    }

    /// Replace the factory used by [`LayoutState::add_component`].
    pub fn set_component_parser(&mut self, factory: ComponentParserFactory) -> &mut Self {
        self.component_parser = factory;
        self
    }

    /// Wrap `component` with the injected factory and append it to the body.
    pub fn add_component(&mut self, component: Component, props: Props) -> &mut ComponentParser {
        let parser = (self.component_parser)(component, props);
        self.schema.add_component(parser)
    }

    /// Add a sub-layer.
    pub fn add_layer(&mut self, id: impl Into<LayerId>) -> &mut Layer {
        self.schema.add_layer(id)
    }

    /// Append a component to a sub-layer, creating the layer if needed.
    pub fn add_to_layer(
        &mut self,
        id: impl Into<LayerId>,
        component: Component,
        props: Props,
    ) -> &mut ComponentParser {
        let parser = (self.component_parser)(component, props);
        self.schema.add_to_layer(id, parser)
    }

    /// Drop every child.
    pub fn clear(&mut self) {
        self.schema.clear();
    }

    /// Call the base container and render children inside the regions it returns.
    pub(crate) fn render(&self, base: &Component, props: &Props) -> anyhow::Result<Output> {
        if self.column_based {
            self.render_columns(base, props)
        } else {
            self.render_rows(base, props)
        }
    }

    fn render_columns(&self, base: &Component, props: &Props) -> anyhow::Result<Output> {
        let body = self.schema.body();
        let order = body.effective_order();

        let output = if props.args.is_empty() {
            let mut props = props.clone();
            props.args.push(order.len().into());
            base.call(&props)?
        } else {
            base.call(props)?
        };

        let Output::Regions(slots) = &output else {
            return Err(RenderError::Layout {
                component: base.name().to_string(),
                expected: "a list of column regions",
            }
            .into());
        };

        for (k, entry) in order.iter().enumerate() {
            let slot = slots.get(k).ok_or_else(|| RenderError::Layout {
                component: base.name().to_string(),
                expected: "one region per body entry",
            })?;
            let _scope = ScopeGuard::enter(slot.as_ref());
            let outcomes = body.render_entry(entry)?;
            debug!(container = %base.name(), column = k, rendered = outcomes.len(), "Rendered column");
        }
        Ok(output)
    }

    fn render_rows(&self, base: &Component, props: &Props) -> anyhow::Result<Output> {
        let output = base.call(props)?;
        let Output::Region(region) = &output else {
            return Err(RenderError::Layout {
                component: base.name().to_string(),
                expected: "a single region",
            }
            .into());
        };

        {
            let _scope = ScopeGuard::enter(region.as_ref());
            let outcomes = self.schema.render()?;
            debug!(container = %base.name(), rendered = outcomes.len(), "Rendered rows");
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::props::Region;
    use crate::render::{RenderOutcome, Renderable};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Slot {
        label: String,
        log: Log,
    }

    impl Region for Slot {
        fn enter(&self) {
            self.log.lock().push(format!("enter {}", self.label));
        }
        fn exit(&self) {
            self.log.lock().push(format!("exit {}", self.label));
        }
    }

    fn writer(log: &Log) -> Component {
        let log = Arc::clone(log);
        Component::new("write", move |props| {
            log.lock().push(format!("write {}", props.args[0]));
            Ok(Output::Empty)
        })
    }

    fn row_container(log: &Log) -> Component {
        let log = Arc::clone(log);
        Component::new("container", move |_| {
            Ok(Output::Region(Arc::new(Slot {
                label: "row".into(),
                log: Arc::clone(&log),
            })))
        })
    }

    #[test]
    fn test_row_container_renders_body_inside_one_region() {
        let log: Log = Arc::default();
        let mut container = Renderable::container(Props::new());
        container.set_base_component(row_container(&log));

        let layout = container.layout_mut().unwrap();
        layout.add_component(writer(&log), Props::new().arg("a"));
        layout.add_component(writer(&log), Props::new().arg("b"));

        let outcome = container.call().unwrap();
        assert!(matches!(outcome, RenderOutcome::Rendered(Output::Region(_))));
        assert_eq!(
            *log.lock(),
            vec!["enter row", "write \"a\"", "write \"b\"", "exit row"]
        );
    }

    #[test]
    fn test_wrong_handle_is_a_layout_failure() {
        let mut container = Renderable::container(Props::new());
        container
            .set_base_component(Component::new("columns", |_| Ok(Output::value(json!(1)))))
            .set_column_based(true);

        let outcome = container.call().unwrap();
        let marker = outcome.failure().expect("layout mismatch should fail");
        assert!(marker
            .error()
            .downcast_ref::<RenderError>()
            .is_some_and(|e| matches!(e, RenderError::Layout { .. })));
    }

    #[test]
    fn test_row_scope_exits_when_child_fails() {
        let log: Log = Arc::default();
        let mut container = Renderable::container(Props::new());
        container.set_base_component(row_container(&log));
        container
            .layout_mut()
            .unwrap()
            .add_component(
                Component::new("broken", |_| Err(anyhow::anyhow!("boom"))),
                Props::new(),
            )
            .set_fatal(true);

        let outcome = container.call().unwrap();
        assert!(outcome.failure().is_some());
        assert_eq!(*log.lock(), vec!["enter row", "exit row"]);
    }
}

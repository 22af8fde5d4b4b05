use super::{ComponentParser, ParseOptions, Parser, ParserCore};
use crate::component::Component;
use crate::error::{SchemaError, SchemaResult};
use crate::layout::LayoutState;
use crate::props::Props;
use crate::registry::ComponentMap;
use crate::render::Renderable;
use crate::schema::{Layer, LayerId, Schema};
use crate::serial::{resolve_component, ParserRecord};
use serde_json::Value as JsonValue;

/// Body layer name for layout parsers.
pub const CHILDREN_BODY: &str = "__children__";

/// Parser for containers: a host container plus the schema of its children.
///
/// Always materializes a container renderable. `column_based` follows the
/// same autoconfig rule as the other flags.
#[derive(Debug, Clone)]
pub struct LayoutParser {
    core: ParserCore,
    schema: Schema,
    column_based: bool,
}

impl LayoutParser {
    /// Wrap a host container and its props.
    pub fn new(container: Component, props: Props) -> Self {
        Self {
            core: ParserCore::new(container, props),
            schema: Schema::new(CHILDREN_BODY),
            column_based: false,
        }
    }

    /// Children schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Mutable children schema.
    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    /// Body layer of the children schema.
    pub fn body(&self) -> &Layer {
        self.schema.body()
    }

    /// Stored column flag.
    pub fn is_column_based(&self) -> bool {
        self.column_based
    }

    /// Render children one per column.
    pub fn set_column_based(&mut self, column_based: bool) -> &mut Self {
        self.column_based = column_based;
        self
    }

    /// Append a leaf component.
    pub fn add_component(&mut self, component: Component, props: Props) -> &mut ComponentParser {
        self.schema
            .add_component(ComponentParser::new(component, props))
    }

    /// Append a nested container.
    pub fn add_container(&mut self, container: Component, props: Props) -> &mut LayoutParser {
        self.schema.add_container(LayoutParser::new(container, props))
    }

    /// Add a sub-layer.
    pub fn add_layer(&mut self, id: impl Into<LayerId>) -> &mut Layer {
        self.schema.add_layer(id)
    }

    /// Append a leaf component to a sub-layer, creating it if needed.
    pub fn add_to_layer(
        &mut self,
        id: impl Into<LayerId>,
        component: Component,
        props: Props,
    ) -> &mut ComponentParser {
        self.schema
            .add_to_layer(id, ComponentParser::new(component, props))
    }

    /// Append a nested container to a sub-layer, creating it if needed.
    pub fn add_container_to_layer(
        &mut self,
        id: impl Into<LayerId>,
        container: Component,
        props: Props,
    ) -> &mut LayoutParser {
        self.schema
            .add_container_to_layer(id, LayoutParser::new(container, props))
    }

    /// Sub-layer lookup.
    pub fn layer(&self, id: &LayerId) -> SchemaResult<&Layer> {
        self.schema.layer(id)
    }

    /// Number of sub-layers.
    pub fn len(&self) -> usize {
        self.schema.len()
    }

    /// Whether there are no sub-layers.
    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }

    /// Rebuild from [`Parser::serialize`] output, including the child schema.
    pub fn deserialize(
        data: &JsonValue,
        components: &dyn ComponentMap,
        strict: bool,
    ) -> SchemaResult<Self> {
        let record = ParserRecord::from_value(data)?;
        if record.kind != Self::TYPE_NAME {
            return Err(SchemaError::malformed(format!(
                "expected {}, found {}",
                Self::TYPE_NAME,
                record.kind
            )));
        }
        let container = resolve_component(components, &record.base.component, strict)?;
        let schema = match &record.base.schema {
            Some(schema) => Schema::deserialize(schema, components, strict)?,
            None => Schema::new(CHILDREN_BODY),
        };

        let mut parser = Self::new(container, record.base.args);
        parser.core.apply_flags(&record.parser);
        parser.schema = schema;
        parser.column_based = record
            .parser
            .column_based
            .or(record.base.column_based)
            .unwrap_or(false);
        Ok(parser)
    }
}

impl Parser for LayoutParser {
    const TYPE_NAME: &'static str = "LayoutParser";

    fn core(&self) -> &ParserCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ParserCore {
        &mut self.core
    }

    fn parse_with(&self, options: ParseOptions) -> Renderable {
        let mut options = self.core.resolve(options);
        if self.core.autoconfig() {
            options.column_based = self.column_based;
        }

        let mut layout = LayoutState::new(self.schema.clone());
        layout.set_column_based(options.column_based);

        let mut renderable = Renderable::with_layout(self.core.props().clone(), layout);
        self.core.configure(&mut renderable, &options);
        renderable
    }

    fn serialize(&self) -> SchemaResult<JsonValue> {
        let record = ParserRecord {
            base: self.parse().to_record()?,
            parser: self.core.flags(Some(self.column_based)),
            kind: Self::TYPE_NAME.to_string(),
        };
        Ok(serde_json::to_value(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{Output, Region};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct Column {
        index: usize,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Region for Column {
        fn enter(&self) {
            self.log.lock().push(format!("enter {}", self.index));
        }
        fn exit(&self) {
            self.log.lock().push(format!("exit {}", self.index));
        }
    }

    #[test]
    fn test_parse_produces_container() {
        let mut parser = LayoutParser::new(Component::noop("container"), Props::new());
        parser.add_component(Component::noop("text"), Props::new());
        let renderable = parser.parse();
        assert!(renderable.is_container());
        assert_eq!(renderable.layout().unwrap().schema().body().len(), 1);
        assert_eq!(
            renderable.layout().unwrap().schema().body_id(),
            &LayerId::from(CHILDREN_BODY)
        );
    }

    #[test]
    fn test_column_based_autoconfig() {
        let mut parser = LayoutParser::new(Component::noop("columns"), Props::new());
        parser.set_column_based(true);
        let renderable = parser.parse_with(ParseOptions::new().column_based(false));
        assert!(renderable.layout().unwrap().is_column_based());

        parser.set_autoconfig(false);
        let renderable = parser.parse_with(ParseOptions::new().column_based(false));
        assert!(!renderable.layout().unwrap().is_column_based());
    }

    #[test]
    fn test_columns_receive_count_and_slots() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(Mutex::new(Vec::new()));

        let region_log = Arc::clone(&log);
        let call_log = Arc::clone(&calls);
        let columns = Component::new("columns", move |props| {
            call_log.lock().push(props.args.clone());
            let count = props.args[0].as_u64().unwrap_or(0) as usize;
            Ok(Output::Regions(
                (0..count)
                    .map(|index| {
                        Arc::new(Column {
                            index,
                            log: Arc::clone(&region_log),
                        }) as Arc<dyn Region>
                    })
                    .collect(),
            ))
        });

        let write_log = Arc::clone(&log);
        let write = Component::new("write", move |props| {
            write_log.lock().push(format!("write {}", props.args[0]));
            Ok(Output::Empty)
        });

        let mut parser = LayoutParser::new(columns, Props::new());
        parser.set_column_based(true);
        parser.add_to_layer(0, write.clone(), Props::new().arg(0));
        parser.add_to_layer(1, write.clone(), Props::new().arg(1));
        parser.add_to_layer(2, write, Props::new().arg(2));

        parser.call().unwrap();
        assert_eq!(*calls.lock(), vec![vec![json!(3)]]);
        assert_eq!(
            *log.lock(),
            vec![
                "enter 0", "write 0", "exit 0", "enter 1", "write 1", "exit 1", "enter 2",
                "write 2", "exit 2",
            ]
        );
    }

    #[test]
    fn test_nested_builders() {
        let mut parser = LayoutParser::new(Component::noop("container"), Props::new());
        parser
            .add_container(Component::noop("expander"), Props::new().arg("More"))
            .add_component(Component::noop("text"), Props::new());
        parser.add_container_to_layer("side", Component::noop("container"), Props::new());

        assert_eq!(parser.len(), 1);
        assert_eq!(parser.layer(&"side".into()).unwrap().len(), 1);
        assert_eq!(parser.body().len(), 2);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut components = HashMap::new();
        for name in ["columns", "text"] {
            components.insert(name.to_string(), Component::noop(name));
        }

        let mut parser = LayoutParser::new(components["columns"].clone(), Props::new());
        parser.set_column_based(true).set_fatal(true);
        parser.add_to_layer("left", components["text"].clone(), Props::new().arg("L"));
        parser.add_to_layer("right", components["text"].clone(), Props::new().arg("R"));

        let data = parser.serialize().unwrap();
        assert_eq!(data["__type__"], json!("LayoutParser"));
        assert_eq!(data["__base__"]["__type__"], json!("Container"));
        assert_eq!(data["__parser__"]["column_based"], json!(true));

        let restored = LayoutParser::deserialize(&data, &components, true).unwrap();
        assert!(restored.is_column_based());
        assert!(restored.core().fatal());
        assert_eq!(
            restored.schema().layer_ids(),
            vec![LayerId::from("left"), LayerId::from("right")]
        );
        assert_eq!(restored.serialize().unwrap(), data);
    }
}

use super::{ParseOptions, Parser, ParserCore};
use crate::component::Component;
use crate::error::{SchemaError, SchemaResult};
use crate::props::Props;
use crate::registry::ComponentMap;
use crate::render::Renderable;
use crate::serial::{resolve_component, ParserRecord};
use serde_json::Value as JsonValue;

/// Parser for leaf components.
///
/// Produces a stateful renderable when `stateful` resolves to true, a plain
/// one otherwise.
#[derive(Debug, Clone)]
pub struct ComponentParser {
    core: ParserCore,
}

impl ComponentParser {
    /// Wrap a component and its props.
    pub fn new(component: Component, props: Props) -> Self {
        Self {
            core: ParserCore::new(component, props),
        }
    }

    /// Rebuild from [`Parser::serialize`] output.
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
        let component = resolve_component(components, &record.base.component, strict)?;
        let mut parser = Self::new(component, record.base.args);
        parser.core.apply_flags(&record.parser);
        Ok(parser)
    }
}

impl Parser for ComponentParser {
    const TYPE_NAME: &'static str = "ComponentParser";

    fn core(&self) -> &ParserCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ParserCore {
        &mut self.core
    }

    fn parse_with(&self, options: ParseOptions) -> Renderable {
        let options = self.core.resolve(options);
        let mut renderable = if options.stateful {
            let mut renderable = Renderable::stateful(self.core.props().clone());
            if let Some(binding) = renderable.binding_mut() {
                binding.set_strict(options.strict);
            }
            renderable
        } else {
            Renderable::new(self.core.props().clone())
        };
        self.core.configure(&mut renderable, &options);
        renderable
    }

    fn serialize(&self) -> SchemaResult<JsonValue> {
        let record = ParserRecord {
            base: self.parse().to_record()?,
            parser: self.core.flags(None),
            kind: Self::TYPE_NAME.to_string(),
        };
        Ok(serde_json::to_value(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::effect;
    use crate::props::Output;
    use crate::render::RenderOutcome;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn failing() -> Component {
        Component::new("chart", |_| Err(anyhow::anyhow!("bad data")))
    }

    #[test]
    fn test_parse_plain_by_default() {
        let parser = ComponentParser::new(Component::noop("text"), Props::new().arg("hi"));
        let renderable = parser.parse();
        assert!(!renderable.is_stateful());
        assert!(!renderable.is_fatal());
        assert_eq!(renderable.props(), &Props::new().arg("hi"));
    }

    #[test]
    fn test_parse_stateful() {
        let mut parser =
            ComponentParser::new(Component::noop("text_input"), Props::new().with_key("name"));
        parser.set_stateful(true).set_strict(false);

        let renderable = parser.parse();
        let binding = renderable.binding().expect("stateful renderable");
        assert_eq!(binding.key.as_deref(), Some("name"));
        assert!(!binding.strict);
    }

    #[test]
    fn test_autoconfig_wins_over_parse_options() {
        let mut parser = ComponentParser::new(failing(), Props::new());
        parser.set_fatal(false);

        let renderable = parser.parse_with(ParseOptions::new().fatal(true));
        assert!(!renderable.is_fatal());

        parser.set_autoconfig(false);
        let renderable = parser.parse_with(ParseOptions::new().fatal(true));
        assert!(renderable.is_fatal());
    }

    #[test]
    fn test_parse_never_caches() {
        let parser = ComponentParser::new(Component::noop("text"), Props::new());
        let mut first = parser.parse();
        first.set_fatal(true);
        assert!(!parser.parse().is_fatal());
    }

    #[test]
    fn test_effects_are_copied() {
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let mut parser = ComponentParser::new(
            Component::new("button", |_| Ok(Output::value(true))),
            Props::new(),
        );
        parser.add_effect(effect(move |_| {
            *counter.lock() += 1;
            Ok(())
        }));

        parser.call().unwrap();
        parser.call().unwrap();
        assert_eq!(*hits.lock(), 2);
    }

    #[test]
    fn test_call_with_overrides_props_only() {
        let mut parser = ComponentParser::new(
            Component::new("echo", |props| Ok(Output::Value(props.args[0].clone()))),
            Props::new().arg("stored"),
        );
        parser.set_fatal(false);

        let outcome = parser.call_with(Props::new().arg("live")).unwrap();
        assert_eq!(outcome.output().and_then(Output::as_value), Some(&json!("live")));
    }

    #[test]
    fn test_call_surfaces_markers() {
        let mut parser = ComponentParser::new(failing(), Props::new());
        parser.set_fatal(true);
        let outcome = parser.call().unwrap();
        assert!(matches!(outcome, RenderOutcome::Failed(ref m) if m.was_fatal()));
    }

    #[test]
    fn test_serialize_shape() {
        let mut parser =
            ComponentParser::new(Component::noop("text_input"), Props::new().with_key("name"));
        parser.set_stateful(true).set_fatal(true);

        let data = parser.serialize().unwrap();
        assert_eq!(data["__type__"], json!("ComponentParser"));
        assert_eq!(data["__base__"]["__component__"], json!("text_input"));
        assert_eq!(data["__base__"]["__type__"], json!("Stateful"));
        assert_eq!(data["__base__"]["__args__"]["kwargs"]["key"], json!("name"));
        assert_eq!(
            data["__parser__"],
            json!({"stateful": true, "fatal": true, "strict": true, "autoconfig": true})
        );
    }

    #[test]
    fn test_deserialize_unknown_component() {
        let parser = ComponentParser::new(Component::noop("sparkline"), Props::new());
        let data = parser.serialize().unwrap();
        let empty: HashMap<String, Component> = HashMap::new();

        let err = ComponentParser::deserialize(&data, &empty, true).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownComponent(ref n) if n == "sparkline"));

        let lenient = ComponentParser::deserialize(&data, &empty, false).unwrap();
        assert_eq!(lenient.component().name(), "sparkline");
        assert!(!lenient.call().unwrap().is_truthy());
    }

    #[test]
    fn test_deserialize_wrong_type() {
        let data = json!({
            "__base__": {"__component__": "text", "__type__": "Container"},
            "__type__": "LayoutParser"
        });
        let empty: HashMap<String, Component> = HashMap::new();
        assert!(matches!(
            ComponentParser::deserialize(&data, &empty, false).unwrap_err(),
            SchemaError::Malformed(_)
        ));
    }
}

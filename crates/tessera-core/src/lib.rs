//! # Tessera Core
//!
//! Declarative component trees over an imperative UI host.
//!
//! Host primitives are wrapped as [`Component`]s. A [`ComponentParser`] or
//! [`LayoutParser`] stores a component with its props and behavior flags and
//! materializes a fresh [`Renderable`] on every rerun. Parsers live in
//! [`Layer`]s; a [`Schema`] owns a body layer and indexes its sub-layers; a
//! [`Canvas`] renders one schema as a page, fragment, or dialog.
//!
//! ## Failure model
//!
//! A component failure becomes a [`NonRenderError`] marker inside
//! [`RenderOutcome::Failed`]. Non-fatal markers are reported and rendering
//! continues. Fatal markers escalate to [`RenderError::Fatal`] when a layer
//! renders them, and a canvas decides whether to swallow them.
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera_core::{Canvas, Component, Output, Parser, Props};
//! use tessera_config::PageConfig;
//!
//! let text = Component::new("text", |props| {
//!     Ok(Output::Value(props.args.first().cloned().unwrap_or_default()))
//! });
//!
//! let mut page = Canvas::page(PageConfig::default());
//! page.add_component(text.clone(), Props::new().arg("Hello"));
//! page.add_to_layer("sidebar", text, Props::new().arg("Menu"))
//!     .set_fatal(true);
//!
//! let outcomes = page.start().unwrap();
//! assert_eq!(outcomes.len(), 2);
//! ```

#![warn(clippy::all)]

pub mod canvas;
pub mod component;
pub mod error;
pub mod layout;
pub mod parser;
pub mod props;
pub mod registry;
pub mod render;
pub mod schema;
pub(crate) mod serial;
pub mod state;

pub use canvas::{Canvas, CanvasKind};
pub use component::{effect, error_handler, Component, ComponentFn, EffectFn, ErrorHandlerFn};
pub use error::{RenderError, RenderResult, SchemaError, SchemaResult, StateError, StateResult};
pub use layout::{ComponentParserFactory, LayoutState, CONTAINER_BODY};
pub use parser::{ComponentParser, LayoutParser, ParseOptions, Parser, ParserCore, CHILDREN_BODY};
pub use props::{Output, Props, Region, ScopeGuard};
pub use registry::{ComponentMap, ParserDefaults, Representation, Standard};
pub use render::{NonRenderError, RenderOutcome, RenderState, Renderable};
pub use schema::{Element, EntryId, Layer, LayerId, Schema, BODY};
pub use state::{MemoryStore, SessionState, StateBinding, StateStore};

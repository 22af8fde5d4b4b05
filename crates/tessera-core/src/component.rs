//! Named host primitives and the callables attached to them.

use crate::props::{Output, Props};
use std::fmt;
use std::sync::Arc;

/// Host primitive signature.
pub type ComponentFn = Arc<dyn Fn(&Props) -> anyhow::Result<Output> + Send + Sync>;

/// Post-render effect, invoked with a truthy render result.
pub type EffectFn = Arc<dyn Fn(&Output) -> anyhow::Result<()> + Send + Sync>;

/// Error handler; returns `true` when the error was handled and should be suppressed.
pub type ErrorHandlerFn = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// A host primitive with a stable name.
///
/// The name is what gets serialized; deserialization resolves it back to a
/// callable through a [`ComponentMap`](crate::registry::ComponentMap).
#[derive(Clone)]
pub struct Component {
    name: Arc<str>,
    func: ComponentFn,
}

impl Component {
    /// Wrap a callable under a name.
    pub fn new<F>(name: impl AsRef<str>, func: F) -> Self
    where
        F: Fn(&Props) -> anyhow::Result<Output> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.as_ref()),
            func: Arc::new(func),
        }
    }

    /// Stand-in that renders nothing. Used when a serialized name cannot be resolved.
    pub fn noop(name: impl AsRef<str>) -> Self {
        Self::new(name, |_| Ok(Output::Empty))
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the primitive.
    pub fn call(&self, props: &Props) -> anyhow::Result<Output> {
        (self.func)(props)
    }

    /// Whether two handles wrap the same callable.
    pub fn same_callable(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component").field("name", &self.name).finish()
    }
}

/// Build an [`EffectFn`] from a closure.
pub fn effect<F>(f: F) -> EffectFn
where
    F: Fn(&Output) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build an [`ErrorHandlerFn`] from a closure.
pub fn error_handler<F>(f: F) -> ErrorHandlerFn
where
    F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

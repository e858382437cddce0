pub mod debug;
pub mod loader;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::callable::{Callable, CallableRegistry};
use crate::config::BridgeConfig;
use crate::environment::{Environment, Renderer};
use crate::error::Result;

pub use debug::DebugExtension;
pub use loader::{CallableKind, CallableLoader, GlobalsExtension};

/// A named callable contributed by an extension.
#[derive(Clone)]
pub struct Registration {
    pub name: String,
    pub callable: Callable,
    /// Output is trusted and bypasses autoescaping.
    pub safe: bool,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("safe", &self.safe)
            .finish_non_exhaustive()
    }
}

/// A bundle of filters, functions, tests and globals attached to a renderer.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn filters(&self) -> Vec<Registration> {
        Vec::new()
    }

    fn functions(&self) -> Vec<Registration> {
        Vec::new()
    }

    fn tests(&self) -> Vec<Registration> {
        Vec::new()
    }

    fn globals(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// What extension constructors get to see of the host.
#[derive(Clone, Copy)]
pub struct ExtensionContext<'a> {
    config: &'a BridgeConfig,
    callables: &'a CallableRegistry,
}

impl<'a> ExtensionContext<'a> {
    pub fn new(config: &'a BridgeConfig, callables: &'a CallableRegistry) -> Self {
        Self { config, callables }
    }

    pub fn config(&self) -> &'a BridgeConfig {
        self.config
    }

    pub fn callables(&self) -> &'a CallableRegistry {
        self.callables
    }
}

pub type ExtensionFactory<R> =
    Arc<dyn Fn(&ExtensionContext<'_>, &R) -> Result<Arc<dyn Extension>> + Send + Sync>;

/// One configured way of obtaining an extension.
pub enum ExtensionDescriptor<R = Environment> {
    /// Constructed through the [`ExtensionRegistry`] entry of that name.
    Named(String),
    Factory(ExtensionFactory<R>),
    Instance(Arc<dyn Extension>),
    /// A configuration value of a shape no extension can be built from.
    Unsupported(Value),
}

impl<R> ExtensionDescriptor<R> {
    /// Classify a value from the `extensions` list of the config file.
    pub fn from_config(value: Value) -> Self {
        match value {
            Value::String(name) => ExtensionDescriptor::Named(name),
            other => ExtensionDescriptor::Unsupported(other),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        ExtensionDescriptor::Named(name.into())
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&ExtensionContext<'_>, &R) -> Result<Arc<dyn Extension>> + Send + Sync + 'static,
    {
        ExtensionDescriptor::Factory(Arc::new(factory))
    }

    pub fn instance(extension: impl Extension + 'static) -> Self {
        ExtensionDescriptor::Instance(Arc::new(extension))
    }
}

impl<R> Clone for ExtensionDescriptor<R> {
    fn clone(&self) -> Self {
        match self {
            ExtensionDescriptor::Named(name) => ExtensionDescriptor::Named(name.clone()),
            ExtensionDescriptor::Factory(factory) => ExtensionDescriptor::Factory(factory.clone()),
            ExtensionDescriptor::Instance(extension) => {
                ExtensionDescriptor::Instance(extension.clone())
            }
            ExtensionDescriptor::Unsupported(value) => {
                ExtensionDescriptor::Unsupported(value.clone())
            }
        }
    }
}

impl<R> fmt::Debug for ExtensionDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionDescriptor::Named(name) => f.debug_tuple("Named").field(name).finish(),
            ExtensionDescriptor::Factory(_) => f.write_str("Factory(..)"),
            ExtensionDescriptor::Instance(extension) => {
                f.debug_tuple("Instance").field(&extension.name()).finish()
            }
            ExtensionDescriptor::Unsupported(value) => {
                f.debug_tuple("Unsupported").field(value).finish()
            }
        }
    }
}

/// Constructors for extensions that configuration refers to by name.
pub struct ExtensionRegistry<R = Environment> {
    factories: BTreeMap<String, ExtensionFactory<R>>,
}

impl<R> Default for ExtensionRegistry<R> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<R: Renderer + 'static> ExtensionRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `loader.filters`, `loader.functions`, `loader.tests`, `loader.globals` and `debug`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for kind in [
            CallableKind::Filter,
            CallableKind::Function,
            CallableKind::Test,
        ] {
            registry.register(kind.extension_name(), move |context, _| {
                Ok(Arc::new(CallableLoader::load(kind, context)?) as Arc<dyn Extension>)
            });
        }
        registry.register(GlobalsExtension::NAME, |context, _| {
            Ok(Arc::new(GlobalsExtension::from_config(context.config())) as Arc<dyn Extension>)
        });
        registry.register(DebugExtension::NAME, |context, _| {
            let enabled = context.config().renderer.options.debug;
            Ok(Arc::new(DebugExtension::new(enabled)) as Arc<dyn Extension>)
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ExtensionContext<'_>, &R) -> Result<Arc<dyn Extension>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }
}

impl<R> ExtensionRegistry<R> {
    pub fn get(&self, name: &str) -> Option<&ExtensionFactory<R>> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_descriptor_from_config() {
        let named = ExtensionDescriptor::<Environment>::from_config(json!("debug"));
        assert!(matches!(named, ExtensionDescriptor::Named(name) if name == "debug"));

        let number = ExtensionDescriptor::<Environment>::from_config(json!(42));
        assert!(matches!(number, ExtensionDescriptor::Unsupported(v) if v == json!(42)));

        let table = ExtensionDescriptor::<Environment>::from_config(json!({ "name": "x" }));
        assert!(matches!(table, ExtensionDescriptor::Unsupported(_)));
    }

    #[test]
    fn test_builtin_names() {
        let registry = ExtensionRegistry::<Environment>::with_builtins();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "debug",
                "loader.filters",
                "loader.functions",
                "loader.globals",
                "loader.tests"
            ]
        );
    }
}

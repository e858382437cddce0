pub mod callable;
pub mod config;
pub mod environment;
pub mod error;
pub mod extension;
pub mod lexer;
pub mod logging;
pub mod registrar;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::callable::{Callable, CallableRegistry};
use crate::config::{load_config, BridgeConfig, RendererOptions};
use crate::environment::{Environment, TemplateLoader};
use crate::error::Result;
use crate::extension::{Extension, ExtensionContext, ExtensionDescriptor, ExtensionRegistry};
use crate::lexer::Lexer;
use crate::registrar::{ExtensionRegistrar, ExtensionsLoaded, Listener};

pub use crate::error::BridgeError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds configured Tera renderers for a host application.
///
/// Holds the loaded config plus everything the host registers programmatically:
/// callables, named extension constructors, extra descriptors and listeners.
/// Every call to [`Bridge::renderer`] builds a fresh [`Environment`].
pub struct Bridge {
    config: BridgeConfig,
    callables: CallableRegistry,
    extensions: ExtensionRegistry<Environment>,
    descriptors: Vec<ExtensionDescriptor>,
    listeners: Vec<Listener<Environment>>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            callables: CallableRegistry::with_builtins(),
            extensions: ExtensionRegistry::with_builtins(),
            descriptors: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Load `bridge.toml` from a file or directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::new(load_config(path)?))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// File extension of templates on disk.
    pub fn template_extension(&self) -> &str {
        &self.config.renderer.extension
    }

    pub fn options(&self) -> &RendererOptions {
        &self.config.renderer.options
    }

    /// Configured extensions followed by those pushed with [`Bridge::push_extension`].
    pub fn extension_descriptors(&self) -> Vec<ExtensionDescriptor> {
        self.config
            .renderer
            .extensions
            .iter()
            .cloned()
            .map(ExtensionDescriptor::from_config)
            .chain(self.descriptors.iter().cloned())
            .collect()
    }

    pub fn lexer(&self) -> Result<Lexer> {
        self.config.renderer.delimiters.lexer()
    }

    pub fn loader(&self) -> TemplateLoader {
        TemplateLoader::new(
            self.config.renderer.paths.clone(),
            self.config.renderer.extension.clone(),
        )
    }

    pub fn callables(&self) -> &CallableRegistry {
        &self.callables
    }

    pub fn callables_mut(&mut self) -> &mut CallableRegistry {
        &mut self.callables
    }

    pub fn register_callable(&mut self, name: impl Into<String>, callable: Callable) -> &mut Self {
        self.callables.register(name, callable);
        self
    }

    /// Make an extension constructor available to the `extensions` list by name.
    pub fn register_extension<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ExtensionContext<'_>, &Environment) -> Result<Arc<dyn Extension>>
            + Send
            + Sync
            + 'static,
    {
        self.extensions.register(name, factory);
        self
    }

    pub fn push_extension(&mut self, descriptor: ExtensionDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Run `listener` after every extension is registered and before the lexer is set.
    pub fn on_extensions_loaded<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(ExtensionsLoaded<'_, Environment>) -> Result<()> + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Build a renderer: attach extensions, notify listeners, set the lexer,
    /// then load templates from the configured paths.
    pub fn renderer(&self) -> Result<Environment> {
        let mut environment = Environment::new(self.loader(), self.options().clone());
        let context = ExtensionContext::new(&self.config, &self.callables);

        ExtensionRegistrar::new(&self.extensions)
            .with_listeners(&self.listeners)
            .build(&self.extension_descriptors(), &context, &mut environment)?;

        let templates = environment.load_templates()?;
        info!(
            templates,
            extensions = environment.extension_names().count(),
            "renderer ready"
        );
        Ok(environment)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::Value;
    use tera::Context;

    use super::*;
    use crate::callable::callable;

    fn bridge(toml_str: &str) -> Bridge {
        let mut config: BridgeConfig = toml::from_str(toml_str).unwrap();
        config.renderer.paths.clear();
        Bridge::new(config)
    }

    #[test]
    fn test_programmatic_descriptors_follow_configured_ones() {
        let mut bridge = bridge("[renderer]\nextensions = [\"debug\"]\n");
        bridge.push_extension(ExtensionDescriptor::named("loader.filters"));

        let names: Vec<_> = bridge
            .extension_descriptors()
            .into_iter()
            .map(|d| format!("{d:?}"))
            .collect();
        assert_eq!(names, vec!["Named(\"debug\")", "Named(\"loader.filters\")"]);
    }

    #[test]
    fn test_renderer_uses_registered_callables() {
        let mut bridge = bridge(
            r#"
[renderer]
extensions = ["loader.filters"]

[filters]
greet = "App@greet"
"#,
        );
        bridge.callables_mut().register_method(
            "App",
            "greet",
            callable(|call| {
                let name = call.value.and_then(Value::as_str).unwrap_or("nobody");
                Ok(Value::String(format!("Hello, {name}")))
            }),
        );

        let mut environment = bridge.renderer().unwrap();
        let mut context = Context::new();
        context.insert("who", "Ann");
        assert_eq!(
            environment.render_str("{{ who | greet }}", &context).unwrap(),
            "Hello, Ann"
        );
    }

    #[test]
    fn test_each_call_builds_a_fresh_renderer() {
        let bridge = bridge("[renderer]\nextensions = [\"debug\"]\n");
        let first = bridge.renderer().unwrap();
        let second = bridge.renderer().unwrap();
        assert_eq!(first.extension_names().count(), 1);
        assert_eq!(second.extension_names().count(), 1);
    }

    #[test]
    fn test_invalid_delimiters_skip_listeners() {
        let mut bridge = bridge(
            r#"
[renderer]
extensions = ["debug"]

[renderer.delimiters]
tag_block = "[["
tag_variable = "[["
"#,
        );
        let notified = Arc::new(AtomicBool::new(false));
        let flag = notified.clone();
        bridge.on_extensions_loaded(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        assert!(matches!(
            bridge.renderer(),
            Err(BridgeError::InvalidDelimiters { .. })
        ));
        assert!(!notified.load(Ordering::SeqCst));
    }

    #[test]
    fn test_invalid_extension_fails_renderer() {
        let bridge = bridge("[renderer]\nextensions = [\"debug\", 7]\n");
        assert!(matches!(
            bridge.renderer(),
            Err(BridgeError::InvalidConfiguration { index: 1, .. })
        ));
    }
}

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::environment::Renderer;
use crate::error::{BridgeError, Result};
use crate::extension::{Extension, ExtensionContext, ExtensionDescriptor, ExtensionRegistry};

/// Name of the event fired once all extensions are registered.
pub const EXTENSIONS_LOADED: &str = "renderer.extensions_loaded";

/// Payload of the [`EXTENSIONS_LOADED`] event.
pub struct ExtensionsLoaded<'r, R> {
    pub renderer: &'r mut R,
}

pub type Listener<R> = Arc<dyn Fn(ExtensionsLoaded<'_, R>) -> Result<()> + Send + Sync>;

pub struct ExtensionRegistrar<'a, R> {
    extensions: &'a ExtensionRegistry<R>,
    listeners: &'a [Listener<R>],
}

impl<'a, R: Renderer> ExtensionRegistrar<'a, R> {
    pub fn new(extensions: &'a ExtensionRegistry<R>) -> Self {
        Self {
            extensions,
            listeners: &[],
        }
    }

    pub fn with_listeners(mut self, listeners: &'a [Listener<R>]) -> Self {
        self.listeners = listeners;
        self
    }

    /// Attach `descriptors` to `renderer`, then notify listeners and install
    /// the lexer configured in `context`.
    ///
    /// Descriptors and delimiters are resolved up front; if either fails the
    /// renderer is left untouched and no listener runs.
    pub fn build(
        &self,
        descriptors: &[ExtensionDescriptor<R>],
        context: &ExtensionContext<'_>,
        renderer: &mut R,
    ) -> Result<()> {
        let lexer = context.config().renderer.delimiters.lexer()?;
        let resolved = descriptors
            .iter()
            .enumerate()
            .map(|(index, descriptor)| self.resolve(index, descriptor, context, &*renderer))
            .collect::<Result<Vec<_>>>()?;

        for extension in resolved {
            debug!(extension = extension.name(), "registering extension");
            renderer.add_extension(extension)?;
        }

        for listener in self.listeners {
            listener(ExtensionsLoaded {
                renderer: &mut *renderer,
            })?;
        }
        debug!(
            event = EXTENSIONS_LOADED,
            listeners = self.listeners.len(),
            "notified listeners"
        );

        renderer.set_lexer(lexer);

        info!(extensions = descriptors.len(), "renderer configured");
        Ok(())
    }

    /// Turn one descriptor into an extension instance.
    pub fn resolve(
        &self,
        index: usize,
        descriptor: &ExtensionDescriptor<R>,
        context: &ExtensionContext<'_>,
        renderer: &R,
    ) -> Result<Arc<dyn Extension>> {
        match descriptor {
            ExtensionDescriptor::Named(name) => {
                let factory = self
                    .extensions
                    .get(name)
                    .ok_or_else(|| BridgeError::UnknownExtension { name: name.clone() })?;
                factory(context, renderer)
            }
            ExtensionDescriptor::Factory(factory) => factory(context, renderer),
            ExtensionDescriptor::Instance(extension) => Ok(extension.clone()),
            ExtensionDescriptor::Unsupported(value) => Err(BridgeError::InvalidConfiguration {
                index,
                found: describe(value),
            }),
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "table".to_string(),
    }
}

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Extension, ExtensionContext, Registration};
use crate::callable::normalize;
use crate::config::BridgeConfig;
use crate::error::Result;

/// Which kind of registration a loader produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Filter,
    Function,
    Test,
}

impl CallableKind {
    pub fn extension_name(self) -> &'static str {
        match self {
            CallableKind::Filter => "loader.filters",
            CallableKind::Function => "loader.functions",
            CallableKind::Test => "loader.tests",
        }
    }
}

/// Registrations read from one callable section of the config.
#[derive(Debug)]
pub struct CallableLoader {
    kind: CallableKind,
    registrations: Vec<Registration>,
}

impl CallableLoader {
    /// Normalize every entry of the section and resolve its target.
    pub fn load(kind: CallableKind, context: &ExtensionContext<'_>) -> Result<Self> {
        let config = context.config();
        let list = match kind {
            CallableKind::Filter => &config.filters,
            CallableKind::Function => &config.functions,
            CallableKind::Test => &config.tests,
        };

        let mut registrations = Vec::with_capacity(list.len());
        for (key, raw) in list.entries() {
            let entry = normalize(key, raw);
            let name = entry.name.to_string();
            let callable = context.callables().resolve(&name, &entry.target)?;

            for option in entry.options.keys().filter(|k| k.as_str() != "is_safe") {
                warn!(name = %name, option = %option, "option has no effect in Tera");
            }

            debug!(kind = ?kind, name = %name, target = ?entry.target, "loaded callable");
            registrations.push(Registration {
                safe: is_safe(&entry.options),
                name,
                callable,
            });
        }

        Ok(Self {
            kind,
            registrations,
        })
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }
}

/// `is_safe = true`, or a list of contexts that contains `"html"`.
fn is_safe(options: &Map<String, Value>) -> bool {
    match options.get("is_safe") {
        Some(Value::Bool(safe)) => *safe,
        Some(Value::Array(contexts)) => contexts.iter().any(|c| c.as_str() == Some("html")),
        _ => false,
    }
}

impl Extension for CallableLoader {
    fn name(&self) -> &str {
        self.kind.extension_name()
    }

    fn filters(&self) -> Vec<Registration> {
        match self.kind {
            CallableKind::Filter => self.registrations.clone(),
            _ => Vec::new(),
        }
    }

    fn functions(&self) -> Vec<Registration> {
        match self.kind {
            CallableKind::Function => self.registrations.clone(),
            _ => Vec::new(),
        }
    }

    fn tests(&self) -> Vec<Registration> {
        match self.kind {
            CallableKind::Test => self.registrations.clone(),
            _ => Vec::new(),
        }
    }
}

/// Values from `[globals]`, visible to every template.
#[derive(Debug, Default)]
pub struct GlobalsExtension {
    globals: Map<String, Value>,
}

impl GlobalsExtension {
    pub const NAME: &'static str = "loader.globals";

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            globals: config.globals.clone(),
        }
    }
}

impl Extension for GlobalsExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn globals(&self) -> Map<String, Value> {
        self.globals.clone()
    }
}

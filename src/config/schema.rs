use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::callable::{Key, RawCallable};
use crate::error::{BridgeError, Result};
use crate::lexer::DelimiterSet;

/// Root config structure deserialized from bridge.toml.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub renderer: RendererConfig,

    #[serde(default)]
    pub filters: CallableList,

    #[serde(default)]
    pub functions: CallableList,

    #[serde(default)]
    pub tests: CallableList,

    /// Values visible to every template through the `loader.globals` extension.
    #[serde(default)]
    pub globals: Map<String, Value>,

    /// Directory the config was loaded from; template paths are relative to it.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RendererConfig {
    /// File extension of templates on disk, without the dot (default: "tera").
    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default = "default_paths")]
    pub paths: Vec<PathBuf>,

    /// Extensions to attach, in order. Anything but a string is rejected
    /// when the renderer is built.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<Value>,

    #[serde(default)]
    pub options: RendererOptions,

    #[serde(default)]
    pub delimiters: DelimiterSet,
}

fn default_extension() -> String {
    "tera".to_string()
}

fn default_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("templates")]
}

fn default_extensions() -> Vec<Value> {
    [
        "loader.filters",
        "loader.functions",
        "loader.tests",
        "loader.globals",
        "debug",
    ]
    .into_iter()
    .map(Value::from)
    .collect()
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            paths: default_paths(),
            extensions: default_extensions(),
            options: RendererOptions::default(),
            delimiters: DelimiterSet::default(),
        }
    }
}

/// Options passed to the renderer when it is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RendererOptions {
    /// Escape output of `.html`, `.htm` and `.xml` templates.
    #[serde(default = "default_autoescape")]
    pub autoescape: bool,

    #[serde(default)]
    pub debug: bool,
}

fn default_autoescape() -> bool {
    true
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            autoescape: default_autoescape(),
            debug: false,
        }
    }
}

/// A `[filters]`-style section: a table keyed by name, or a positional list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CallableList {
    Named(Map<String, Value>),
    Positional(Vec<Value>),
}

impl Default for CallableList {
    fn default() -> Self {
        CallableList::Named(Map::new())
    }
}

impl CallableList {
    /// Entries in declaration order, keyed the way `normalize` expects.
    pub fn entries(&self) -> Vec<(Key, RawCallable)> {
        match self {
            CallableList::Named(table) => table
                .iter()
                .map(|(name, value)| (Key::Name(name.clone()), RawCallable::from(value.clone())))
                .collect(),
            CallableList::Positional(list) => list
                .iter()
                .enumerate()
                .map(|(index, value)| (Key::Index(index), RawCallable::from(value.clone())))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CallableList::Named(table) => table.len(),
            CallableList::Positional(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BridgeConfig {
    /// Validate the config for internal consistency.
    pub fn validate(&self) -> Result<()> {
        let extension = &self.renderer.extension;
        if extension.is_empty() || extension.starts_with('.') {
            return Err(BridgeError::ConfigInvalid {
                reason: format!(
                    "renderer.extension must be a non-empty extension without a leading dot, got '{extension}'"
                ),
            });
        }

        self.renderer.delimiters.lexer()?;

        Ok(())
    }
}

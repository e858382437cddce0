#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error("Bridge config not found at {path}")]
    #[diagnostic(help("Pass --config or create a bridge.toml next to your templates"))]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse bridge.toml")]
    #[diagnostic(help("Check the TOML syntax in your bridge.toml file"))]
    ConfigParse {
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {reason}")]
    ConfigInvalid { reason: String },

    #[error("Incorrect extension type at position {index}: {found}")]
    #[diagnostic(help(
        "Extensions must be given by name, as a factory, or as a constructed extension"
    ))]
    InvalidConfiguration { index: usize, found: String },

    #[error("Unknown extension '{name}'")]
    #[diagnostic(help("Register the extension with Bridge::register_extension before building"))]
    UnknownExtension { name: String },

    #[error("Unknown callable '{name}'")]
    #[diagnostic(help("Register the callable on the bridge's callable registry"))]
    UnknownCallable { name: String },

    #[error("Invalid callable for '{name}': {reason}")]
    InvalidCallable { name: String, reason: String },

    #[error("Invalid delimiters: {reason}")]
    #[diagnostic(help("Delimiters must be non-empty and each tag needs a distinct start"))]
    InvalidDelimiters { reason: String },

    #[error("Unclosed tag in '{template}' at byte {offset}: expected '{delimiter}'")]
    UnclosedTag {
        template: String,
        delimiter: String,
        offset: usize,
    },

    #[error("Failed to load template '{name}'")]
    #[diagnostic(help("Check your Tera template syntax"))]
    TemplateError {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("Template rendering failed for '{name}'")]
    RenderError {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("Template directory not found: {path}")]
    #[diagnostic(help("Create the directory or remove it from renderer.paths"))]
    TemplateDirectoryMissing { path: PathBuf },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse context data")]
    #[diagnostic(help("Context files must contain a JSON object"))]
    ContextParse {
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, BridgeError>;

use std::path::Path;

use miette::Result;
use serde_json::Value;
use tera::Context;
use terabridge::{Bridge, BridgeError};

pub fn run(
    template: String,
    config: String,
    data: Vec<String>,
    context_file: Option<String>,
) -> Result<()> {
    let bridge = Bridge::from_path(Path::new(&config))?;
    let renderer = bridge.renderer()?;

    let mut context = match context_file {
        Some(path) => read_context(Path::new(&path))?,
        None => Context::new(),
    };
    for (key, value) in parse_data(data) {
        context.insert(key, &value);
    }

    let output = renderer.render(&template, &context)?;
    print!("{output}");
    Ok(())
}

fn read_context(path: &Path) -> Result<Context, BridgeError> {
    let content = std::fs::read_to_string(path).map_err(|e| BridgeError::Io {
        context: format!("reading {}", path.display()),
        source: e,
    })?;
    let value: Value =
        serde_json::from_str(&content).map_err(|e| BridgeError::ContextParse { source: e })?;
    Context::from_value(value).map_err(|e| BridgeError::RenderError {
        name: path.display().to_string(),
        source: e,
    })
}

/// `key=value` pairs; values are JSON when they parse, strings otherwise.
fn parse_data(data: Vec<String>) -> Vec<(String, Value)> {
    data.into_iter()
        .filter_map(|kv| {
            let (key, raw) = kv.split_once('=')?;
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.into()));
            Some((key.to_string(), value))
        })
        .collect()
}

use serde_json::Value;

use super::{Extension, Registration};
use crate::callable::{callable, Call};

/// Provides `dump(...)`, which pretty-prints its arguments as JSON.
///
/// Renders an empty string unless the renderer runs with `debug = true`.
#[derive(Debug, Clone, Copy)]
pub struct DebugExtension {
    enabled: bool,
}

impl DebugExtension {
    pub const NAME: &'static str = "debug";

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

impl Extension for DebugExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn functions(&self) -> Vec<Registration> {
        let enabled = self.enabled;
        vec![Registration {
            name: "dump".to_string(),
            callable: callable(move |call| dump(enabled, call)),
            safe: false,
        }]
    }
}

fn dump(enabled: bool, call: Call<'_>) -> tera::Result<Value> {
    if !enabled {
        return Ok(Value::String(String::new()));
    }

    let subject = match call.args.get("value") {
        Some(value) if call.args.len() == 1 => value.clone(),
        _ => {
            let mut args: Vec<_> = call.args.iter().collect();
            args.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                args.into_iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )
        }
    };

    serde_json::to_string_pretty(&subject)
        .map(Value::String)
        .map_err(|e| tera::Error::msg(format!("dump failed: {e}")))
}

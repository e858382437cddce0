//! String helpers exposed as `Str@...` callables.

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use tera::{Result, Value};

use super::{callable, Call, CallableRegistry};

pub(crate) fn register(registry: &mut CallableRegistry) {
    registry.register_method(
        "Str",
        "snake",
        callable(|call| map_str(call, "snake", |s| s.to_snake_case())),
    );
    registry.register_method(
        "Str",
        "camel",
        callable(|call| map_str(call, "camel", |s| s.to_lower_camel_case())),
    );
    registry.register_method(
        "Str",
        "studly",
        callable(|call| map_str(call, "studly", |s| s.to_upper_camel_case())),
    );
    registry.register_method(
        "Str",
        "kebab",
        callable(|call| map_str(call, "kebab", |s| s.to_kebab_case())),
    );
    registry.register_method("Str", "slug", callable(slug));
    registry.register_method(
        "Str",
        "upper",
        callable(|call| map_str(call, "upper", str::to_uppercase)),
    );
    registry.register_method(
        "Str",
        "lower",
        callable(|call| map_str(call, "lower", str::to_lowercase)),
    );
}

/// The subject string: the filtered value, or a `value` argument when called as a function.
fn subject<'a>(call: &'a Call<'_>, helper: &str) -> Result<&'a str> {
    call.value
        .or_else(|| call.args.get("value"))
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("Str@{helper} expects a string")))
}

fn map_str(call: Call<'_>, helper: &str, f: impl Fn(&str) -> String) -> Result<Value> {
    let s = subject(&call, helper)?;
    Ok(Value::String(f(s)))
}

fn slug(call: Call<'_>) -> Result<Value> {
    let s = subject(&call, "slug")?;
    let separator = call
        .args
        .get("separator")
        .and_then(Value::as_str)
        .unwrap_or("-");

    let slug = s
        .to_kebab_case()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::String(slug))
}

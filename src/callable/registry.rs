use std::collections::BTreeMap;

use serde_json::Value;

use super::{builtins, Callable, Target};
use crate::error::{BridgeError, Result};

/// Named callables that configuration entries can refer to.
#[derive(Clone, Default)]
pub struct CallableRegistry {
    callables: BTreeMap<String, Callable>,
}

impl CallableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the `Str@...` string helpers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register(&mut registry);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, callable: Callable) {
        self.callables.insert(name.into(), callable);
    }

    /// Register a callable reachable as `class@method`.
    pub fn register_method(&mut self, class: &str, method: &str, callable: Callable) {
        self.register(method_name(class, method), callable);
    }

    pub fn get(&self, name: &str) -> Option<&Callable> {
        self.callables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.callables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.callables.keys().map(String::as_str)
    }

    /// Resolve a normalized target into a live callable.
    ///
    /// `name` is the registration the target belongs to and only appears in errors.
    pub fn resolve(&self, name: &str, target: &Target) -> Result<Callable> {
        match target {
            Target::Callable(callable) => Ok(callable.clone()),
            Target::Reference(reference) => self.lookup(reference),
            Target::Method { class, method } => self.lookup(&method_name(class, method)),
            Target::Value(Value::Array(pair)) => match pair.as_slice() {
                [Value::String(class), Value::String(method)] => {
                    self.lookup(&method_name(class, method))
                }
                _ => Err(BridgeError::InvalidCallable {
                    name: name.to_string(),
                    reason: "expected a [class, method] pair".into(),
                }),
            },
            Target::Value(other) => Err(BridgeError::InvalidCallable {
                name: name.to_string(),
                reason: format!("{other} is not callable"),
            }),
        }
    }

    fn lookup(&self, reference: &str) -> Result<Callable> {
        self.callables
            .get(reference)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownCallable {
                name: reference.to_string(),
            })
    }
}

fn method_name(class: &str, method: &str) -> String {
    format!("{class}@{method}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::callable::{callable, normalize, Call, Key};

    fn constant(value: &'static str) -> Callable {
        callable(move |_| Ok(Value::String(value.to_string())))
    }

    fn invoke(f: &Callable) -> Value {
        let args = HashMap::new();
        f(Call {
            value: None,
            args: &args,
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_reference() {
        let mut registry = CallableRegistry::new();
        registry.register("hello", constant("hi"));

        let resolved = registry
            .resolve("greet", &Target::Reference("hello".into()))
            .unwrap();
        assert_eq!(invoke(&resolved), json!("hi"));
    }

    #[test]
    fn test_resolve_method_from_normalized_entry() {
        let mut registry = CallableRegistry::new();
        registry.register_method("Foo", "setup", constant("ready"));

        let entry = normalize(Key::Index(0), json!({ "callback": "Foo@setup" }).into());
        let resolved = registry.resolve("Foo@setup", &entry.target).unwrap();
        assert_eq!(invoke(&resolved), json!("ready"));
    }

    #[test]
    fn test_resolve_pair_value() {
        let mut registry = CallableRegistry::new();
        registry.register_method("Foo", "bar", constant("pair"));

        let resolved = registry
            .resolve("bar", &Target::Value(json!(["Foo", "bar"])))
            .unwrap();
        assert_eq!(invoke(&resolved), json!("pair"));
    }

    #[test]
    fn test_unknown_reference_errors() {
        let registry = CallableRegistry::new();
        let err = registry
            .resolve("missing", &Target::Reference("nope".into()))
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::UnknownCallable { name } if name == "nope"));
    }

    #[test]
    fn test_non_callable_value_errors() {
        let registry = CallableRegistry::new();
        let err = registry
            .resolve("count", &Target::Value(json!(3)))
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::InvalidCallable { name, .. } if name == "count"));
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = CallableRegistry::with_builtins();
        assert!(registry.contains("Str@slug"));
        assert!(registry.contains("Str@snake"));
        assert!(registry.names().all(|name| name.starts_with("Str@")));
    }
}

pub mod builtins;
pub mod registry;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

pub use registry::CallableRegistry;

/// The reserved option key naming the callable inside an options mapping.
pub const CALLBACK_KEY: &str = "callback";

/// Arguments handed to a [`Callable`].
///
/// Filters and tests receive the value they apply to; functions receive `None`.
/// Positional test arguments arrive keyed by their index (`"0"`, `"1"`, ...).
pub struct Call<'a> {
    pub value: Option<&'a Value>,
    pub args: &'a HashMap<String, Value>,
}

pub type Callable = Arc<dyn Fn(Call<'_>) -> tera::Result<Value> + Send + Sync>;

/// Wrap a closure as a [`Callable`].
pub fn callable<F>(f: F) -> Callable
where
    F: Fn(Call<'_>) -> tera::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Key of a configuration entry: a name from a table, or a position in a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// What a registration points at once normalized.
#[derive(Clone)]
pub enum Target {
    Callable(Callable),
    Reference(String),
    /// A `Class@method` reference split at the first `@`.
    Method { class: String, method: String },
    /// Any other shape, passed through untouched.
    Value(Value),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Callable(_) => f.write_str("Callable(..)"),
            Target::Reference(name) => f.debug_tuple("Reference").field(name).finish(),
            Target::Method { class, method } => f
                .debug_struct("Method")
                .field("class", class)
                .field("method", method)
                .finish(),
            Target::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Target::Callable(a), Target::Callable(b)) => Arc::ptr_eq(a, b),
            (Target::Reference(a), Target::Reference(b)) => a == b,
            (
                Target::Method { class, method },
                Target::Method {
                    class: other_class,
                    method: other_method,
                },
            ) => class == other_class && method == other_method,
            (Target::Value(a), Target::Value(b)) => a == b,
            _ => false,
        }
    }
}

impl Target {
    fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Target::Reference(s),
            other => Target::Value(other),
        }
    }

    fn from_key(key: &Key) -> Self {
        match key {
            Key::Name(name) => Target::Reference(name.clone()),
            Key::Index(index) => Target::Value(Value::from(*index)),
        }
    }
}

/// A configuration entry before normalization.
#[derive(Clone)]
pub enum RawCallable {
    Callable(Callable),
    /// A configuration value. Objects are options mappings.
    Value(Value),
    /// An options mapping whose callback is a live callable.
    WithOptions {
        callback: Callable,
        options: Map<String, Value>,
    },
}

impl From<Value> for RawCallable {
    fn from(value: Value) -> Self {
        RawCallable::Value(value)
    }
}

impl From<&str> for RawCallable {
    fn from(value: &str) -> Self {
        RawCallable::Value(Value::String(value.to_string()))
    }
}

impl From<Callable> for RawCallable {
    fn from(callable: Callable) -> Self {
        RawCallable::Callable(callable)
    }
}

/// Canonical `(name, target, options)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationEntry {
    pub name: Key,
    pub target: Target,
    /// Never contains [`CALLBACK_KEY`].
    pub options: Map<String, Value>,
}

/// Normalize a loosely-shaped configuration entry.
///
/// Never fails: shapes that are neither strings nor mappings pass through as
/// the target and are left for the consumer to reject.
pub fn normalize(key: Key, raw: RawCallable) -> RegistrationEntry {
    let mut key = key;

    let (target, options) = match raw {
        RawCallable::Value(Value::Object(mut options)) => match options.remove(CALLBACK_KEY) {
            Some(callback) => (Target::from_value(callback), options),
            None => (Target::from_key(&key), options),
        },
        RawCallable::Value(value) => (Target::from_value(value), Map::new()),
        RawCallable::Callable(callable) => (Target::Callable(callable), Map::new()),
        RawCallable::WithOptions {
            callback,
            mut options,
        } => {
            options.remove(CALLBACK_KEY);
            (Target::Callable(callback), options)
        }
    };

    let target = match target {
        Target::Reference(reference) => {
            if let Key::Index(_) = key {
                key = Key::Name(reference.clone());
            }
            match reference.split_once('@') {
                Some((class, method)) => Target::Method {
                    class: class.to_string(),
                    method: method.to_string(),
                },
                None => Target::Reference(reference),
            }
        }
        other => other,
    };

    RegistrationEntry {
        name: key,
        target,
        options,
    }
}

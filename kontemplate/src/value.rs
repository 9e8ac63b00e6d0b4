//! The dynamic value model for template variables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};
use serde_yaml::{Mapping as YamlMapping, Value as YamlValue};

/// We use [`std::collections::BTreeMap`] as our default map structure so that
/// iteration over variables is always deterministic.
pub type Map<K, V> = BTreeMap<K, V>;

/// A flat mapping of variable names to values. Every variable layer, as well
/// as the final set of variables bound to a template, takes this shape.
pub type Bindings = Map<String, Value>;

/// A loosely typed value, as loaded from a YAML or JSON file or supplied on
/// the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Signed(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Self::Unsigned(u)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T> From<Map<String, T>> for Value
where
    T: Into<Value>,
{
    fn from(m: Map<String, T>) -> Self {
        Self::Object(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Boolean(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Signed(i)
                } else if let Some(u) = n.as_u64() {
                    Self::Unsigned(u)
                } else {
                    // serde_json numbers are always one of the three
                    Self::Float(n.as_f64().unwrap_or_default())
                }
            }
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(arr) => Self::Array(arr.into_iter().map(Into::into).collect()),
            JsonValue::Object(obj) => {
                Self::Object(obj.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<Value> for JsonValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Boolean(b) => Self::Bool(b),
            Value::String(s) => Self::String(s),
            // NaN and infinities have no JSON representation.
            Value::Float(f) => JsonNumber::from_f64(f)
                .map(Self::Number)
                .unwrap_or(Self::Null),
            Value::Signed(i) => Self::Number(JsonNumber::from(i)),
            Value::Unsigned(u) => Self::Number(JsonNumber::from(u)),
            Value::Array(v) => Self::Array(v.into_iter().map(Into::into).collect()),
            Value::Object(o) => {
                Self::Object(JsonMap::from_iter(o.into_iter().map(|(k, v)| (k, v.into()))))
            }
        }
    }
}

impl From<Value> for YamlValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Boolean(b) => Self::Bool(b),
            Value::Signed(i) => Self::Number(i.into()),
            Value::Unsigned(u) => Self::Number(u.into()),
            Value::Float(f) => Self::Number(f.into()),
            Value::String(s) => Self::String(s),
            Value::Array(v) => Self::Sequence(v.into_iter().map(Into::into).collect()),
            Value::Object(o) => {
                let mut mapping = YamlMapping::new();
                for (k, v) in o {
                    mapping.insert(Self::String(k), v.into());
                }
                Self::Mapping(mapping)
            }
        }
    }
}

/// Converts a set of bindings into the JSON object handed to the template
/// engine.
pub fn bindings_to_json(bindings: &Bindings) -> JsonValue {
    JsonValue::Object(JsonMap::from_iter(
        bindings
            .iter()
            .map(|(k, v)| (k.clone(), JsonValue::from(v.clone()))),
    ))
}

//! Structured event payloads.
//!
//! `EventValue` is the closed set of shapes an event payload may take. Keeping
//! it a tagged union (rather than an opaque blob) makes canonical encoding
//! total: every value has exactly one normalized form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A payload value: primitive, array, or string-keyed mapping.
///
/// Serializes as plain JSON. Map keys are held in a `BTreeMap`, so insertion
/// order never leaks into any serialized form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Array(Vec<EventValue>),
    Map(BTreeMap<String, EventValue>),
}

impl EventValue {
    /// An empty mapping.
    pub fn empty_map() -> Self {
        EventValue::Map(BTreeMap::new())
    }

    /// Build a mapping from `(key, value)` pairs. Later duplicates win.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<EventValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        EventValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Look up a key on a mapping. Returns `None` for non-mappings.
    pub fn get(&self, key: &str) -> Option<&EventValue> {
        match self {
            EventValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EventValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            EventValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, EventValue::Null)
    }

    /// Return the single normalized form of this value.
    ///
    /// - a float with no fractional part that fits in `i64` becomes `Integer`
    /// - a non-finite float becomes `Null`
    /// - mapping entries whose (normalized) value is `Null` are removed, so an
    ///   absent key and a null key are indistinguishable
    ///
    /// Array elements keep their position, including nulls.
    pub fn normalized(&self) -> EventValue {
        match self {
            EventValue::Float(f) => normalize_float(*f),
            EventValue::Array(items) => {
                EventValue::Array(items.iter().map(EventValue::normalized).collect())
            }
            EventValue::Map(map) => EventValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.normalized()))
                    .filter(|(_, v)| !v.is_null())
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Convert to a `serde_json::Value` without normalizing.
    ///
    /// Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            EventValue::Null => Value::Null,
            EventValue::Bool(b) => Value::Bool(*b),
            EventValue::Integer(n) => Value::Number(Number::from(*n)),
            EventValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            EventValue::Text(s) => Value::String(s.clone()),
            EventValue::Array(items) => Value::Array(items.iter().map(EventValue::to_json).collect()),
            EventValue::Map(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                Value::Object(out)
            }
        }
    }
}

fn normalize_float(f: f64) -> EventValue {
    if !f.is_finite() {
        return EventValue::Null;
    }
    // i64::MIN is exactly representable; i64::MAX rounds up to 2^63, which is
    // out of range, hence the strict upper bound.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        EventValue::Integer(f as i64)
    } else {
        EventValue::Float(f)
    }
}

impl From<Value> for EventValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => EventValue::Null,
            Value::Bool(b) => EventValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => EventValue::Integer(i),
                None => n.as_f64().map(normalize_float).unwrap_or(EventValue::Null),
            },
            Value::String(s) => EventValue::Text(s),
            Value::Array(items) => EventValue::Array(items.into_iter().map(EventValue::from).collect()),
            Value::Object(map) => {
                EventValue::Map(map.into_iter().map(|(k, v)| (k, EventValue::from(v))).collect())
            }
        }
    }
}

impl From<&EventValue> for Value {
    fn from(value: &EventValue) -> Self {
        value.to_json()
    }
}

impl From<bool> for EventValue {
    fn from(b: bool) -> Self {
        EventValue::Bool(b)
    }
}

impl From<i64> for EventValue {
    fn from(n: i64) -> Self {
        EventValue::Integer(n)
    }
}

impl From<u32> for EventValue {
    fn from(n: u32) -> Self {
        EventValue::Integer(i64::from(n))
    }
}

impl From<u64> for EventValue {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(i) => EventValue::Integer(i),
            Err(_) => EventValue::Float(n as f64),
        }
    }
}

impl From<f64> for EventValue {
    fn from(f: f64) -> Self {
        EventValue::Float(f)
    }
}

impl From<&str> for EventValue {
    fn from(s: &str) -> Self {
        EventValue::Text(s.to_string())
    }
}

impl From<String> for EventValue {
    fn from(s: String) -> Self {
        EventValue::Text(s)
    }
}

impl<T: Into<EventValue>> From<Option<T>> for EventValue {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(EventValue::Null)
    }
}

impl<T: Into<EventValue>> From<Vec<T>> for EventValue {
    fn from(items: Vec<T>) -> Self {
        EventValue::Array(items.into_iter().map(Into::into).collect())
    }
}

//! Universal value model
//!
//! Every remote record is flattened into a [`Value`] tree before it is
//! written to disk. Binary payloads stay raw inside the tree; base64 is
//! applied only when the tree is serialized.
//!
//! JSON has no NaN or infinity, so non-finite floats are written as the
//! strings `"NaN"`, `"Infinity"` and `"-Infinity"`.

use base64::prelude::*;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Numeric scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Lossless intermediate representation of a remote record
///
/// Maps keep insertion order and never hold the same key twice.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Binary(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Build a map from ordered entries
    ///
    /// A repeated key keeps the position of its first occurrence and the
    /// value of its last.
    pub fn map_from(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut map: Vec<(String, Value)> = Vec::new();
        for (key, value) in entries {
            match map.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => map.push((key, value)),
            }
        }
        Value::Map(map)
    }

    /// Look up a key in a map value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(Number::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Keys of a map value, in order
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Value::Map(entries) => entries.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Serialize to the on-disk artifact format (pretty JSON)
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Int(n)) => serializer.serialize_i64(*n),
            Value::Number(Number::Float(f)) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Number(Number::Float(f)) => serializer.serialize_str(non_finite_name(*f)),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Binary(bytes) => serializer.serialize_str(&BASE64_STANDARD.encode(bytes)),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

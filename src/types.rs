//! The ZON value model.
//!
//! Unlike [`serde_json::Value`], integers and floats are distinct variants:
//! ZON's round-trip guarantee depends on not silently widening `42` into
//! `42.0` or vice versa. Objects keep insertion order in a `Vec<(String, Value)>`
//! rather than a `BTreeMap`, mirroring how `toon-core::types::ToonValue` models
//! objects, because the wire grammar defines its own column ordering (lexicographic
//! by key) independently of whatever order a `Value::Map` happens to hold.

use std::collections::HashMap;

/// A ZON document value. Mirrors the JSON value domain but keeps integers and
/// floats distinct, per the data model described below.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    /// Key-value pairs. Order is insertion order on construction; the codec
    /// itself never relies on it (schema columns are always sorted).
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_empty_map(&self) -> bool {
        matches!(self, Value::Map(fields) if fields.is_empty())
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// True for any value that's safe to use as a table cell directly:
    /// everything except a non-empty map (flattening turns those into columns).
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Value::Map(fields) if !fields.is_empty())
    }

    /// A numeric value as `f64`, for strategies that treat ints and floats
    /// uniformly (RANGE, DELTA). Returns `None` for non-numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Look up a field on a map by key, ignoring order.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl TryFrom<Value> for serde_json::Value {
    type Error = std::convert::Infallible;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        Ok(match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => serde_json::Value::Array(
                items
                    .into_iter()
                    .map(|v| serde_json::Value::try_from(v).unwrap())
                    .collect(),
            ),
            Value::Map(fields) => serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::try_from(v).unwrap()))
                    .collect(),
            ),
        })
    }
}

/// A single flattened record: an ordered dotted-key path to leaf value
/// mapping, as produced by [`crate::flatten::flatten`].
pub type FlatRow = Vec<(String, Value)>;

/// A sparse lookup of a flat row by key, built once per row for column access.
pub(crate) fn row_lookup(row: &FlatRow) -> HashMap<&str, &Value> {
    row.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_roundtrip_preserves_int_float_distinction() {
        let v = Value::from(serde_json::json!({"a": 1, "b": 1.5}));
        assert_eq!(v.get("a"), Some(&Value::Int(1)));
        assert_eq!(v.get("b"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn get_ignores_missing_key() {
        let v = Value::Map(vec![("x".into(), Value::Int(1))]);
        assert_eq!(v.get("y"), None);
    }
}

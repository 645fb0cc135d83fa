//! Typed attribute values.
//!
//! Probe output is a flat map of string keys to `Value`. `Absent` records
//! that an extractor looked for a field but could not produce one, which is
//! distinct from the field being zero or empty. The untagged serde form
//! keeps persisted cache files hand-editable JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute map attached to a file record.
pub type AttrMap = BTreeMap<String, Value>;

/// A single extracted metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Absent,
}

impl Value {
    /// Integer view. `Float` values are truncated; text is not parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Numeric view covering both integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Lifts an optional value, mapping `None` to `Absent`.
    pub fn from_opt<T: Into<Value>>(opt: Option<T>) -> Value {
        opt.map(Into::into).unwrap_or(Value::Absent)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Int(n as i64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Int(44100).as_f64(), Some(44100.0));
        assert_eq!(Value::Float(3.5).as_i64(), Some(3));
        assert_eq!(Value::Text("x".into()).as_f64(), None);
        assert_eq!(Value::Absent.as_i64(), None);
    }

    #[test]
    fn test_from_opt_maps_none_to_absent() {
        assert_eq!(Value::from_opt(Some(2u32)), Value::Int(2));
        assert!(Value::from_opt::<u32>(None).is_absent());
    }

    #[test]
    fn test_json_round_trip() {
        let mut map = AttrMap::new();
        map.insert("duration".to_string(), Value::Float(12.5));
        map.insert("channels".to_string(), Value::Int(2));
        map.insert("format".to_string(), Value::Text("flac".to_string()));
        map.insert("bitrate".to_string(), Value::Absent);

        let json = serde_json::to_string(&map).unwrap();
        let back: AttrMap = serde_json::from_str(&json).unwrap();

        assert_eq!(back, map);
        assert!(json.contains("\"bitrate\":null"));
    }

    #[test]
    fn test_absent_distinct_from_zero() {
        assert_ne!(Value::Absent, Value::Int(0));
        assert_ne!(Value::Absent, Value::Text(String::new()));
    }
}

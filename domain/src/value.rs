//! Opaque structured-data value used for payloads, step parameters, and
//! event bodies whose shape is per-instance rather than known statically.
//!
//! Accessors return `Result` rather than panicking so callers on hot paths
//! cannot accidentally propagate an untyped value forward without handling
//! the missing/wrong-type case.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<DynValue>),
    Object(BTreeMap<String, DynValue>),
}

#[derive(Debug, Error, PartialEq)]
pub enum DynValueError {
    #[error("missing field '{0}'")]
    Missing(String),
    #[error("field '{0}' has wrong type, expected {1}")]
    WrongType(String, &'static str),
}

impl Default for DynValue {
    fn default() -> Self {
        DynValue::Null
    }
}

impl DynValue {
    pub fn object() -> Self {
        DynValue::Object(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DynValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, DynValue>> {
        match self {
            DynValue::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a key on an object value. Returns `None` if this is not an
    /// object or the key is absent.
    pub fn get(&self, key: &str) -> Option<&DynValue> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// Typed string accessor with explicit failure, for callers that must
    /// not silently continue with an untyped value.
    pub fn require_str(&self, key: &str) -> Result<&str, DynValueError> {
        match self.get(key) {
            None => Err(DynValueError::Missing(key.to_string())),
            Some(v) => v
                .as_str()
                .ok_or_else(|| DynValueError::WrongType(key.to_string(), "string")),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: DynValue) {
        if let DynValue::Object(m) = self {
            m.insert(key.into(), value);
        }
    }
}

impl From<serde_json::Value> for DynValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => DynValue::Null,
            serde_json::Value::Bool(b) => DynValue::Bool(b),
            serde_json::Value::Number(n) => DynValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => DynValue::String(s),
            serde_json::Value::Array(a) => DynValue::Array(a.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(o) => {
                DynValue::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<DynValue> for serde_json::Value {
    fn from(v: DynValue) -> Self {
        match v {
            DynValue::Null => serde_json::Value::Null,
            DynValue::Bool(b) => serde_json::Value::Bool(b),
            DynValue::Number(n) => serde_json::json!(n),
            DynValue::String(s) => serde_json::Value::String(s),
            DynValue::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            DynValue::Object(o) => {
                serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_str_missing() {
        let v = DynValue::object();
        assert_eq!(
            v.require_str("orderId"),
            Err(DynValueError::Missing("orderId".into()))
        );
    }

    #[test]
    fn require_str_wrong_type() {
        let mut v = DynValue::object();
        v.set("orderId", DynValue::Number(1.0));
        assert_eq!(
            v.require_str("orderId"),
            Err(DynValueError::WrongType("orderId".into(), "string"))
        );
    }

    #[test]
    fn require_str_present() {
        let mut v = DynValue::object();
        v.set("orderId", DynValue::String("ORD-123".into()));
        assert_eq!(v.require_str("orderId"), Ok("ORD-123"));
    }

    #[test]
    fn json_roundtrip() {
        let json = serde_json::json!({"a": 1, "b": [1,2,"x"], "c": null});
        let dv: DynValue = json.clone().into();
        let back: serde_json::Value = dv.into();
        assert_eq!(json, back);
    }
}

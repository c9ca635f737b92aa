//! Application-side values
//!
//! `Value` is the closed set of kinds the codec knows how to store. Structured
//! data enters through `Serializable` and lives as a JSON document in
//! `Value::Generic`.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::TypeTag;
use crate::error::{CacheError, Result};

/// A value as the application sees it
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Byte sequence or text, stored verbatim
    Raw(Bytes),

    /// Floating point number
    Number(f64),

    /// Explicit absence
    Nil,

    Boolean(bool),

    /// Structured value in its parsed textual form
    Generic(serde_json::Value),
}

/// Opt-in contract for types stored as `Generic` values.
///
/// The default methods use JSON text. Overrides must still produce JSON,
/// since `Generic` payloads are parsed as JSON on the way back.
pub trait Serializable: Serialize + DeserializeOwned {
    fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn from_text(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Value {
    /// Wrap a structured object as a `Generic` value
    pub fn from_object<T: Serializable>(object: &T) -> Result<Self> {
        let text = object.to_text()?;
        let document = serde_json::from_str(&text)
            .map_err(|e| CacheError::Serialization(format!("object text is not JSON: {}", e)))?;
        Ok(Value::Generic(document))
    }

    /// Rebuild a structured object from a `Generic` value
    pub fn into_object<T: Serializable>(self) -> Result<T> {
        match self {
            Value::Generic(document) => T::from_text(&document.to_string()),
            other => Err(CacheError::Decode(format!(
                "expected a generic value, found {}",
                other.tag()
            ))),
        }
    }

    /// Tag this value is stored under
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Raw(_) => TypeTag::Raw,
            Value::Number(_) => TypeTag::Number,
            Value::Nil => TypeTag::Nil,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Generic(_) => TypeTag::Generic,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// JSON rendering for display; raw bytes become a lossy UTF-8 string
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Raw(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Nil => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Generic(document) => document.clone(),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Raw(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Raw(Bytes::from(text))
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Raw(Bytes::copy_from_slice(bytes))
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Raw(Bytes::from(bytes))
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Value::Raw(bytes)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(document: serde_json::Value) -> Self {
        Value::Generic(document)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Nil,
        }
    }
}

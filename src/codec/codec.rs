//! Value codec
//!
//! Encoding and decoding between `Value` and the cache's `bytes + flags`.
//!
//! ## Payload by Tag
//! - RAW:     bytes verbatim
//! - NUMBER:  fixed-point decimal text, 16 fractional digits ("2.5000000000000000")
//! - NIL:     "nil"
//! - BOOLEAN: "1" or "0"
//! - GENERIC: JSON text
//!
//! Any flags value without a known tag decodes as RAW.

use bytes::Bytes;

use super::{TypeTag, Value};
use crate::error::{CacheError, Result};

/// Fractional digits written for numbers
pub const NUMBER_FRACTION_DIGITS: usize = 16;

pub const NIL_PAYLOAD: &[u8] = b"nil";
pub const TRUE_PAYLOAD: &[u8] = b"1";
pub const FALSE_PAYLOAD: &[u8] = b"0";

/// Encoded form of a value: the flags word and the payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue {
    pub flags: u32,
    pub payload: Bytes,
}

impl CacheValue {
    pub fn new(tag: TypeTag, payload: Bytes) -> Self {
        Self {
            flags: tag.flags(),
            payload,
        }
    }

    /// Tag carried in the flags, if this build knows it
    pub fn tag(&self) -> Option<TypeTag> {
        TypeTag::from_flags(self.flags)
    }

    pub fn decode(&self) -> Result<Value> {
        decode(self.payload.clone(), self.flags)
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value for storage. Never fails.
pub fn encode(value: &Value) -> CacheValue {
    let payload = match value {
        Value::Raw(bytes) => bytes.clone(),
        Value::Number(n) => Bytes::from(format_number(*n)),
        Value::Nil => Bytes::from_static(NIL_PAYLOAD),
        Value::Boolean(true) => Bytes::from_static(TRUE_PAYLOAD),
        Value::Boolean(false) => Bytes::from_static(FALSE_PAYLOAD),
        Value::Generic(document) => Bytes::from(document.to_string()),
    };
    CacheValue::new(value.tag(), payload)
}

fn format_number(n: f64) -> String {
    format!("{:.*}", NUMBER_FRACTION_DIGITS, n)
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a payload according to the tag in `flags`
pub fn decode(payload: impl Into<Bytes>, flags: u32) -> Result<Value> {
    let payload = payload.into();
    let tag = match TypeTag::from_flags(flags) {
        Some(tag) => tag,
        None => {
            tracing::trace!("Unknown type tag {}, decoding as raw", flags);
            return Ok(Value::Raw(payload));
        }
    };

    match tag {
        TypeTag::Raw => Ok(Value::Raw(payload)),
        TypeTag::Number => decode_number(&payload),
        // The tag alone says nil; the payload carries nothing else.
        TypeTag::Nil => Ok(Value::Nil),
        TypeTag::Boolean => decode_boolean(&payload),
        TypeTag::Generic => decode_generic(&payload),
    }
}

fn decode_number(payload: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| CacheError::Decode("number payload is not UTF-8".to_string()))?;
    text.trim()
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|e| CacheError::Decode(format!("invalid number payload {:?}: {}", text, e)))
}

fn decode_boolean(payload: &[u8]) -> Result<Value> {
    match payload {
        TRUE_PAYLOAD => Ok(Value::Boolean(true)),
        FALSE_PAYLOAD => Ok(Value::Boolean(false)),
        other => Err(CacheError::Decode(format!(
            "invalid boolean payload {:?}",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn decode_generic(payload: &[u8]) -> Result<Value> {
    let document: serde_json::Value = serde_json::from_slice(payload)?;
    Ok(Value::Generic(document))
}

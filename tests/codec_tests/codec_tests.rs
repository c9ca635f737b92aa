//! Codec Tests
//!
//! Tests for value encoding/decoding and the type tag contract.

use bytes::Bytes;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use typedcache::codec::{decode, encode, CacheValue, Serializable, TypeTag, Value};
use typedcache::CacheError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    tags: Vec<String>,
    score: Option<f64>,
}

impl Serializable for Profile {}

fn roundtrip(value: &Value) -> Value {
    let encoded = encode(value);
    decode(encoded.payload, encoded.flags).unwrap()
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_roundtrip_raw_text() {
    let value = Value::from("hello world");
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_roundtrip_raw_binary() {
    let value = Value::from(vec![0x00, 0xFF, 0x80, b'\r', b'\n']);
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_roundtrip_empty_raw() {
    let value = Value::from("");
    let encoded = encode(&value);
    assert!(encoded.payload.is_empty());
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_roundtrip_nil() {
    assert_eq!(roundtrip(&Value::Nil), Value::Nil);
}

#[test]
fn test_roundtrip_booleans() {
    assert_eq!(roundtrip(&Value::Boolean(true)), Value::Boolean(true));
    assert_eq!(roundtrip(&Value::Boolean(false)), Value::Boolean(false));
}

#[test]
fn test_roundtrip_numbers() {
    for n in [0.0, 1.0, -1.0, 0.1, 3.141592653589793, 1e15, -2.5e-3] {
        let back = roundtrip(&Value::Number(n)).as_f64().unwrap();
        assert!((back - n).abs() < 1e-10, "{} came back as {}", n, back);
    }
}

#[test]
fn test_roundtrip_generic_document() {
    let value = Value::Generic(serde_json::json!({
        "list": [1, 2, 3],
        "nested": {"ok": true},
        "text": "x y"
    }));
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_roundtrip_serializable_object() {
    let profile = Profile {
        name: "ada".to_string(),
        tags: vec!["admin".to_string(), "ops".to_string()],
        score: Some(9.5),
    };
    let value = Value::from_object(&profile).unwrap();
    let back: Profile = roundtrip(&value).into_object().unwrap();
    assert_eq!(back, profile);
}

// =============================================================================
// Tag Contract
// =============================================================================

#[test]
fn test_boolean_payloads_are_stable() {
    let t = encode(&Value::Boolean(true));
    assert_eq!(t.tag(), Some(TypeTag::Boolean));
    assert_eq!(&t.payload[..], b"1");

    let f = encode(&Value::Boolean(false));
    assert_eq!(f.tag(), Some(TypeTag::Boolean));
    assert_eq!(&f.payload[..], b"0");
}

#[test]
fn test_nil_payload_is_literal() {
    let encoded = encode(&Value::Nil);
    assert_eq!(encoded.flags, TypeTag::Nil.flags());
    assert_eq!(&encoded.payload[..], b"nil");
}

#[test]
fn test_number_has_sixteen_fraction_digits() {
    let encoded = encode(&Value::Number(1.0));
    assert_eq!(&encoded.payload[..], b"1.0000000000000000");

    let text = std::str::from_utf8(&encoded.payload).unwrap();
    let (_, fraction) = text.split_once('.').unwrap();
    assert_eq!(fraction.len(), 16);
}

#[test]
fn test_raw_uses_zero_flags() {
    // Items written by clients that do not tag values read back as raw
    assert_eq!(encode(&Value::from("x")).flags, 0);
    assert_eq!(
        decode(Bytes::from_static(b"plain"), 0).unwrap(),
        Value::from("plain")
    );
}

#[test]
fn test_unknown_tag_returns_raw_bytes() {
    let payload = Bytes::from_static(b"\x00written by a newer client");
    for flags in [5, 42, 0xFFFF, u32::MAX] {
        assert_eq!(
            decode(payload.clone(), flags).unwrap(),
            Value::Raw(payload.clone())
        );
    }
}

#[test]
fn test_cache_value_carries_tag() {
    let cv = CacheValue::new(TypeTag::Number, Bytes::from_static(b"7.0000000000000000"));
    assert_eq!(cv.flags, 1);
    assert_eq!(cv.decode().unwrap(), Value::Number(7.0));
}

// =============================================================================
// Decode Failures
// =============================================================================

#[test]
fn test_malformed_generic_is_decode_error() {
    let result = decode(Bytes::from_static(b"{\"open\": "), TypeTag::Generic.flags());
    assert!(matches!(result, Err(CacheError::Decode(_))));
}

#[test]
fn test_non_numeric_number_payload_is_decode_error() {
    let result = decode(Bytes::from_static(b"12abc"), TypeTag::Number.flags());
    assert!(matches!(result, Err(CacheError::Decode(_))));
}

#[test]
fn test_decode_failure_leaves_codec_usable() {
    assert!(decode(Bytes::from_static(b"]["), TypeTag::Generic.flags()).is_err());
    let value = Value::Generic(serde_json::json!([1]));
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_object_shape_mismatch_is_decode_error() {
    let value = Value::Generic(serde_json::json!({"name": 1}));
    assert!(matches!(
        value.into_object::<Profile>(),
        Err(CacheError::Decode(_))
    ));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_raw_roundtrip(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let value = Value::from(bytes);
        prop_assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn prop_number_roundtrip(n in -1.0e12f64..1.0e12f64) {
        let back = roundtrip(&Value::Number(n)).as_f64().unwrap();
        prop_assert!((back - n).abs() < 1e-10, "{} came back as {}", n, back);
    }

    #[test]
    fn prop_boolean_roundtrip(b in any::<bool>()) {
        prop_assert_eq!(roundtrip(&Value::Boolean(b)), Value::Boolean(b));
    }

    #[test]
    fn prop_unknown_tag_is_identity(
        bytes in prop::collection::vec(any::<u8>(), 0..64),
        flags in 5u32..,
    ) {
        let payload = Bytes::from(bytes);
        prop_assert_eq!(decode(payload.clone(), flags).unwrap(), Value::Raw(payload));
    }
}

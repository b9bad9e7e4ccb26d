// src/convert.rs
//! Decoding of OTLP `AnyValue` and attribute lists into plain nested data.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::decode::otlp::{AnyValue, KeyValue};

/// Maximum array/kvlist nesting decoded below a single value.
pub const DEFAULT_MAX_VALUE_DEPTH: usize = 32;

/// Largest magnitude at which every integer is exactly representable in `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// String-keyed mapping in first-insertion order.
pub type PlainMap = IndexMap<String, PlainValue>;

/// A decoded `AnyValue`. Serializes to the natural JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlainValue {
    Null,
    String(String),
    Bool(bool),
    /// Decimal text of a 64-bit integer; never routed through `f64`.
    Int(String),
    /// Always finite. Integral values serialize without a fraction.
    #[serde(serialize_with = "serialize_double")]
    Double(f64),
    /// Base64 text as received.
    Bytes(String),
    Array(Vec<PlainValue>),
    Map(PlainMap),
}

/// Decode a value with the default depth limit. Absent decodes to null.
pub fn decode_value(value: Option<&AnyValue>) -> PlainValue {
    decode_value_bounded(value, DEFAULT_MAX_VALUE_DEPTH)
}

/// Decode a value allowing at most `depth` nested containers.
/// A container beyond the limit decodes to null.
pub fn decode_value_bounded(value: Option<&AnyValue>, depth: usize) -> PlainValue {
    let Some(value) = value else {
        return PlainValue::Null;
    };

    match value {
        AnyValue::String(s) => PlainValue::String(s.clone()),
        AnyValue::Bool(b) => PlainValue::Bool(*b),
        AnyValue::Int(i) => PlainValue::Int(i.clone()),
        AnyValue::Double(d) => double_value(*d),
        AnyValue::Bytes(b) => PlainValue::Bytes(b.clone()),
        AnyValue::Array(_) | AnyValue::KvList(_) if depth == 0 => {
            debug!("value nesting exceeds depth limit, truncating to null");
            PlainValue::Null
        }
        AnyValue::Array(values) => PlainValue::Array(
            values
                .iter()
                .map(|v| decode_value_bounded(Some(v), depth - 1))
                .collect(),
        ),
        AnyValue::KvList(entries) => PlainValue::Map(decode_key_value_list_bounded(
            Some(entries.as_slice()),
            depth - 1,
        )),
        // Producers send `{}` for unset values; that is null, not an error.
        AnyValue::Empty => PlainValue::Null,
    }
}

/// JSON has no non-finite numbers, so those keep their proto3 text.
fn double_value(d: f64) -> PlainValue {
    if d.is_nan() {
        PlainValue::String("NaN".to_string())
    } else if d.is_infinite() {
        let text = if d > 0.0 { "Infinity" } else { "-Infinity" };
        PlainValue::String(text.to_string())
    } else {
        PlainValue::Double(d)
    }
}

fn serialize_double<S: Serializer>(d: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if d.fract() == 0.0 && d.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*d as i64)
    } else {
        serializer.serialize_f64(*d)
    }
}

/// Fold an attribute list into a mapping with the default depth limit.
pub fn decode_key_value_list(list: Option<&[KeyValue]>) -> PlainMap {
    decode_key_value_list_bounded(list, DEFAULT_MAX_VALUE_DEPTH)
}

/// Fold an attribute list into a mapping. A repeated key keeps its first
/// position and takes the last value.
pub fn decode_key_value_list_bounded(list: Option<&[KeyValue]>, depth: usize) -> PlainMap {
    let Some(list) = list else {
        return PlainMap::new();
    };

    let mut map = PlainMap::with_capacity(list.len());
    for kv in list {
        map.insert(kv.key.clone(), decode_value_bounded(kv.value.as_ref(), depth));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s(v: &str) -> AnyValue {
        AnyValue::String(v.to_string())
    }

    fn nested_arrays(levels: usize) -> AnyValue {
        let mut value = s("leaf");
        for _ in 0..levels {
            value = AnyValue::Array(vec![value]);
        }
        value
    }

    #[test]
    fn absent_and_empty_decode_to_null() {
        assert_eq!(decode_value(None), PlainValue::Null);
        assert_eq!(decode_value(Some(&AnyValue::Empty)), PlainValue::Null);
    }

    #[test]
    fn scalars_decode_to_their_plain_form() {
        assert_eq!(decode_value(Some(&s("x"))), PlainValue::String("x".into()));
        assert_eq!(
            decode_value(Some(&AnyValue::Bool(true))),
            PlainValue::Bool(true)
        );
        assert_eq!(
            decode_value(Some(&AnyValue::Int("18446744073709551615".into()))),
            PlainValue::Int("18446744073709551615".into())
        );
        assert_eq!(
            decode_value(Some(&AnyValue::Double(0.25))),
            PlainValue::Double(0.25)
        );
        assert_eq!(
            decode_value(Some(&AnyValue::Bytes("AQI=".into()))),
            PlainValue::Bytes("AQI=".into())
        );
    }

    #[test]
    fn non_finite_doubles_keep_their_text() {
        assert_eq!(
            decode_value(Some(&AnyValue::Double(f64::NAN))),
            PlainValue::String("NaN".into())
        );
        assert_eq!(
            decode_value(Some(&AnyValue::Double(f64::INFINITY))),
            PlainValue::String("Infinity".into())
        );
        assert_eq!(
            decode_value(Some(&AnyValue::Double(f64::NEG_INFINITY))),
            PlainValue::String("-Infinity".into())
        );
    }

    #[test]
    fn integral_doubles_serialize_without_fraction() {
        let text = |d: f64| {
            serde_json::to_string(&decode_value(Some(&AnyValue::Double(d)))).unwrap()
        };
        assert_eq!(text(3.0), "3");
        assert_eq!(text(-0.0), "0");
        assert_eq!(text(1.5), "1.5");
        assert_eq!(text(-2.25), "-2.25");
        assert_eq!(text(1e300), "1e300");
    }

    #[test]
    fn arrays_keep_order() {
        let value = AnyValue::Array(vec![s("a"), AnyValue::Bool(false), AnyValue::Empty]);
        let decoded = decode_value(Some(&value));
        assert_eq!(
            serde_json::to_value(&decoded).unwrap(),
            json!(["a", false, null])
        );
    }

    #[test]
    fn kvlist_decodes_to_map() {
        let value = AnyValue::KvList(vec![
            KeyValue::new("a", AnyValue::Int("1".into())),
            KeyValue::new("b", AnyValue::KvList(vec![KeyValue::new("c", s("d"))])),
        ]);
        let decoded = decode_value(Some(&value));
        assert_eq!(
            serde_json::to_value(&decoded).unwrap(),
            json!({"a": "1", "b": {"c": "d"}})
        );
    }

    #[test]
    fn duplicate_keys_last_write_wins() {
        let list = vec![
            KeyValue::new("k", s("a")),
            KeyValue::new("other", s("x")),
            KeyValue::new("k", s("b")),
        ];
        let map = decode_key_value_list(Some(list.as_slice()));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("k"), Some(&PlainValue::String("b".into())));
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["k", "other"]);
    }

    #[test]
    fn absent_list_is_empty_map() {
        assert!(decode_key_value_list(None).is_empty());
        assert!(decode_key_value_list(Some(&[][..])).is_empty());
    }

    #[test]
    fn missing_value_in_key_value_is_null() {
        let list = vec![KeyValue {
            key: "k".into(),
            value: None,
        }];
        let map = decode_key_value_list(Some(list.as_slice()));
        assert_eq!(map.get("k"), Some(&PlainValue::Null));
    }

    #[test]
    fn nesting_within_limit_is_kept() {
        let decoded = decode_value_bounded(Some(&nested_arrays(3)), 3);
        assert_eq!(
            serde_json::to_value(&decoded).unwrap(),
            json!([[["leaf"]]])
        );
    }

    #[test]
    fn nesting_beyond_limit_truncates_to_null() {
        let decoded = decode_value_bounded(Some(&nested_arrays(4)), 3);
        assert_eq!(serde_json::to_value(&decoded).unwrap(), json!([[[null]]]));

        let deep = nested_arrays(DEFAULT_MAX_VALUE_DEPTH + 5);
        let decoded = decode_value(Some(&deep));
        let text = serde_json::to_string(&decoded).unwrap();
        assert_eq!(text.matches('[').count(), DEFAULT_MAX_VALUE_DEPTH);
        assert!(text.contains("null"));
    }

    #[test]
    fn scalars_ignore_depth_budget() {
        assert_eq!(
            decode_value_bounded(Some(&s("x")), 0),
            PlainValue::String("x".into())
        );
    }
}

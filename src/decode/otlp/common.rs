// src/decode/otlp/common.rs
//! OTLP/JSON value types shared by the logs request model.
//!
//! Everything here is lenient: a member of the wrong JSON type reads as
//! absent instead of failing the request it belongs to.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

/// OTLP's tagged-union value.
///
/// On the wire this is an object where at most one of `stringValue`,
/// `boolValue`, `intValue`, `doubleValue`, `bytesValue`, `arrayValue` or
/// `kvlistValue` is set. It is folded into exactly one variant at parse time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "JsonValue")]
pub enum AnyValue {
    String(String),
    Bool(bool),
    /// 64-bit integer kept as its decimal text.
    Int(String),
    /// May be non-finite: proto3 JSON spells those `"NaN"`, `"Infinity"`, `"-Infinity"`.
    Double(f64),
    /// Base64 text, surfaced as-is.
    Bytes(String),
    Array(Vec<AnyValue>),
    KvList(Vec<KeyValue>),
    /// No member populated with a usable value.
    Empty,
}

/// One attribute entry.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<AnyValue>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: AnyValue) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
        }
    }

    /// Entries that are not objects are dropped. A non-string key reads as `""`.
    fn from_json(value: JsonValue) -> Option<Self> {
        let JsonValue::Object(mut entry) = value else {
            debug!("skipping attribute entry that is not an object");
            return None;
        };
        let key = match entry.remove("key") {
            Some(JsonValue::String(key)) => key,
            _ => String::new(),
        };
        let value = match entry.remove("value") {
            None | Some(JsonValue::Null) => None,
            Some(value) => Some(AnyValue::from(value)),
        };
        Some(Self { key, value })
    }
}

impl From<JsonValue> for AnyValue {
    // Precedence when a producer sets several members: string, bool, int,
    // double, bytes, array, kvlist. A member of the wrong type is skipped.
    fn from(raw: JsonValue) -> Self {
        let JsonValue::Object(mut raw) = raw else {
            return AnyValue::Empty;
        };

        if let Some(JsonValue::String(s)) = raw.remove("stringValue") {
            return AnyValue::String(s);
        }
        if let Some(JsonValue::Bool(b)) = raw.remove("boolValue") {
            return AnyValue::Bool(b);
        }
        if let Some(i) = raw.remove("intValue").and_then(integer_text) {
            return AnyValue::Int(i);
        }
        if let Some(d) = raw.remove("doubleValue").and_then(double_value) {
            return AnyValue::Double(d);
        }
        if let Some(JsonValue::String(b)) = raw.remove("bytesValue") {
            return AnyValue::Bytes(b);
        }
        if let Some(values) = container_values(&mut raw, "arrayValue") {
            return AnyValue::Array(values.into_iter().map(AnyValue::from).collect());
        }
        if let Some(values) = container_values(&mut raw, "kvlistValue") {
            return AnyValue::KvList(values.into_iter().filter_map(KeyValue::from_json).collect());
        }
        AnyValue::Empty
    }
}

/// Decimal text of an integer given as a JSON string or an integral number.
fn integer_text(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if s.trim().parse::<i128>().is_ok() => Some(s),
        JsonValue::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

/// A double given as a JSON number or as text, including the proto3 names
/// for non-finite values.
fn double_value(value: JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.trim().parse().ok(),
        },
        _ => None,
    }
}

/// `values` of an `arrayValue`/`kvlistValue` object. A missing or `null`
/// list is empty; a container that is not an object is skipped.
fn container_values(raw: &mut Map<String, JsonValue>, member: &str) -> Option<Vec<JsonValue>> {
    let JsonValue::Object(mut container) = raw.remove(member)? else {
        return None;
    };
    match container.remove("values") {
        Some(JsonValue::Array(values)) => Some(values),
        _ => Some(Vec::new()),
    }
}

fn from_value_or_default<T: DeserializeOwned + Default>(value: JsonValue) -> T {
    if value.is_null() {
        return T::default();
    }
    serde_json::from_value(value).unwrap_or_else(|e| {
        debug!(error = %e, "ignoring malformed field");
        T::default()
    })
}

/// Deserialize a field, reading `null` or a value of the wrong type as the default.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(from_value_or_default(JsonValue::deserialize(deserializer)?))
}

/// Deserialize a list of records. Every entry is kept; one that cannot be
/// read becomes a default entry.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(items) => items.into_iter().map(from_value_or_default).collect(),
        _ => Vec::new(),
    })
}

/// Deserialize an attribute list, skipping entries that are not objects.
pub(crate) fn key_values<'de, D>(deserializer: D) -> Result<Vec<KeyValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(items) => items.into_iter().filter_map(KeyValue::from_json).collect(),
        _ => Vec::new(),
    })
}

/// Deserialize an optional integer field into its decimal text. Anything
/// that is not an integer reads as absent.
pub(crate) fn decimal_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(integer_text(JsonValue::deserialize(deserializer)?))
}

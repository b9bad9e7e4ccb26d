// src/decode/otlp/logs.rs
//! OTLP/JSON `ExportLogsServiceRequest` model.
//!
//! Every list is optional on the wire; missing or `null` lists read as empty.
//! A scalar of the wrong JSON type reads as absent and never fails the request.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use super::common::{decimal_text, key_values, lenient, lenient_list, KeyValue};
use super::AnyValue;

/// Severity names indexed by OTLP severity number.
#[rustfmt::skip]
pub const SEVERITY_NAMES: [&str; 25] = [
    "UNSPECIFIED",
    "TRACE", "TRACE2", "TRACE3", "TRACE4",
    "DEBUG", "DEBUG2", "DEBUG3", "DEBUG4",
    "INFO", "INFO2", "INFO3", "INFO4",
    "WARN", "WARN2", "WARN3", "WARN4",
    "ERROR", "ERROR2", "ERROR3", "ERROR4",
    "FATAL", "FATAL2", "FATAL3", "FATAL4",
];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLogsRequest {
    #[serde(default, deserialize_with = "lenient_list")]
    pub resource_logs: Vec<ResourceLogs>,
}

impl ExportLogsRequest {
    /// Total number of log records across all resources and scopes.
    pub fn log_record_count(&self) -> usize {
        self.resource_logs
            .iter()
            .flat_map(|rl| rl.scope_logs.iter())
            .map(|sl| sl.log_records.len())
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLogs {
    #[serde(default, deserialize_with = "lenient")]
    pub resource: Option<Resource>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub scope_logs: Vec<ScopeLogs>,
    #[serde(default, deserialize_with = "lenient")]
    pub schema_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default, deserialize_with = "key_values")]
    pub attributes: Vec<KeyValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub dropped_attributes_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeLogs {
    #[serde(default, deserialize_with = "lenient")]
    pub scope: Option<InstrumentationScope>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub log_records: Vec<LogRecord>,
    #[serde(default, deserialize_with = "lenient")]
    pub schema_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentationScope {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "key_values")]
    pub attributes: Vec<KeyValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub dropped_attributes_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Nanoseconds since epoch, as decimal text.
    #[serde(default, deserialize_with = "decimal_text")]
    pub time_unix_nano: Option<String>,
    #[serde(default, deserialize_with = "decimal_text")]
    pub observed_time_unix_nano: Option<String>,
    #[serde(default, deserialize_with = "severity_number")]
    pub severity_number: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub severity_text: Option<String>,
    #[serde(default)]
    pub body: Option<AnyValue>,
    #[serde(default, deserialize_with = "key_values")]
    pub attributes: Vec<KeyValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub dropped_attributes_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub flags: Option<u32>,
    /// Hex or base64 text.
    #[serde(default, deserialize_with = "lenient")]
    pub trace_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub span_id: Option<String>,
}

/// Map a protobuf enum name such as `SEVERITY_NUMBER_INFO` to its number.
pub fn severity_number_from_name(name: &str) -> Option<i64> {
    let short = name.strip_prefix("SEVERITY_NUMBER_").unwrap_or(name);
    SEVERITY_NAMES
        .iter()
        .position(|candidate| *candidate == short)
        .map(|idx| idx as i64)
}

/// Protobuf JSON allows enum fields as either the number or the
/// `SEVERITY_NUMBER_*` name. Unknown names and non-integers read as absent.
fn severity_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(name) => severity_number_from_name(&name),
        _ => None,
    })
}

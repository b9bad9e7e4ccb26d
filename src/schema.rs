//! Output schema for the logs pipeline stream.
//!
//! One row per OTLP log record, with resource and scope context copied in.
//! Optional fields are omitted from the JSON when absent; mappings are
//! always present.

use serde::Serialize;

use crate::convert::PlainMap;

/// Columns of the logs stream.
pub const LOG_COLUMNS: &[&str] = &[
    "timestamp",
    "timestamp_ns",
    "observed_timestamp",
    "observed_timestamp_ns",
    "severity_number",
    "severity_text",
    "body",
    "trace_id",
    "span_id",
    "flags",
    "attributes",
    "resource_attributes",
    "scope_name",
    "scope_version",
    "scope_attributes",
    "dropped_attributes_count",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatLogRecord {
    /// ISO-8601, millisecond precision.
    pub timestamp: String,
    pub timestamp_ns: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_timestamp_ns: Option<u64>,
    pub severity_number: i64,
    pub severity_text: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
    pub attributes: PlainMap,
    pub resource_attributes: PlainMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_version: Option<String>,
    pub scope_attributes: PlainMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped_attributes_count: Option<u32>,
}

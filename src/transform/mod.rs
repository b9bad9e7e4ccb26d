// src/transform/mod.rs
//! Flattening of OTLP logs requests into pipeline records.
//!
//! The walk is request -> resource logs -> scope logs -> log record, and
//! emits exactly one [`FlatLogRecord`] per log record in document order.
//! Nothing here returns an error: malformed optional fields fall back to
//! their defaults in [`normalize`].

pub mod clock;
pub mod normalize;

pub use clock::{Clock, FixedClock, SystemClock};

use tracing::debug;

use crate::convert::{
    decode_key_value_list_bounded, decode_value_bounded, PlainMap, PlainValue,
    DEFAULT_MAX_VALUE_DEPTH,
};
use crate::decode::otlp::{AnyValue, ExportLogsRequest, KeyValue, LogRecord};
use crate::schema::FlatLogRecord;
use normalize::{
    format_iso, identifier_to_hex, nano_timestamp_to_iso, nano_timestamp_value, resolve_severity,
};

/// Decoded once per scope, copied into each of its records.
struct ScopeContext<'a> {
    resource_attributes: &'a PlainMap,
    scope_name: Option<&'a str>,
    scope_version: Option<&'a str>,
    scope_attributes: PlainMap,
}

/// Converts OTLP logs requests into flat records.
///
/// Stateless apart from its configuration, so one instance can serve
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct LogsTransformer<C = SystemClock> {
    clock: C,
    max_value_depth: usize,
}

impl LogsTransformer<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for LogsTransformer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LogsTransformer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            max_value_depth: DEFAULT_MAX_VALUE_DEPTH,
        }
    }

    /// Limit array/kvlist nesting inside attribute and body values.
    pub fn with_max_value_depth(mut self, depth: usize) -> Self {
        self.max_value_depth = depth;
        self
    }

    pub fn max_value_depth(&self) -> usize {
        self.max_value_depth
    }

    /// Flatten a request. The output length always equals
    /// [`ExportLogsRequest::log_record_count`].
    pub fn transform(&self, request: &ExportLogsRequest) -> Vec<FlatLogRecord> {
        let mut records = Vec::with_capacity(request.log_record_count());

        for resource_logs in &request.resource_logs {
            let resource_attributes = self.decode_attributes(
                resource_logs
                    .resource
                    .as_ref()
                    .map(|r| r.attributes.as_slice()),
            );

            for scope_logs in &resource_logs.scope_logs {
                let scope = scope_logs.scope.as_ref();
                let context = ScopeContext {
                    resource_attributes: &resource_attributes,
                    scope_name: scope.and_then(|s| s.name.as_deref()),
                    scope_version: scope.and_then(|s| s.version.as_deref()),
                    scope_attributes: self
                        .decode_attributes(scope.map(|s| s.attributes.as_slice())),
                };

                records.extend(
                    scope_logs
                        .log_records
                        .iter()
                        .map(|record| self.transform_record(record, &context)),
                );
            }
        }

        debug!(records = records.len(), "transformed log records");
        records
    }

    fn transform_record(&self, record: &LogRecord, context: &ScopeContext<'_>) -> FlatLogRecord {
        let time = record.time_unix_nano.as_deref();
        let observed = record.observed_time_unix_nano.as_deref();

        // Display time falls back to now, the raw value to 0.
        let timestamp =
            nano_timestamp_to_iso(time).unwrap_or_else(|| format_iso(self.clock.now()));
        let observed_timestamp = nano_timestamp_to_iso(observed);
        let observed_timestamp_ns = observed_timestamp
            .as_ref()
            .map(|_| nano_timestamp_value(observed));

        FlatLogRecord {
            timestamp,
            timestamp_ns: nano_timestamp_value(time),
            observed_timestamp,
            observed_timestamp_ns,
            severity_number: record.severity_number.unwrap_or(0),
            severity_text: resolve_severity(
                record.severity_number,
                record.severity_text.as_deref(),
            ),
            body: self.body_text(record.body.as_ref()),
            trace_id: identifier_to_hex(record.trace_id.as_deref()),
            span_id: identifier_to_hex(record.span_id.as_deref()),
            flags: record.flags,
            attributes: self.decode_attributes(Some(record.attributes.as_slice())),
            resource_attributes: context.resource_attributes.clone(),
            scope_name: context.scope_name.map(str::to_string),
            scope_version: context.scope_version.map(str::to_string),
            scope_attributes: context.scope_attributes.clone(),
            dropped_attributes_count: record.dropped_attributes_count,
        }
    }

    /// String-shaped bodies are used verbatim, everything else as JSON text.
    fn body_text(&self, body: Option<&AnyValue>) -> String {
        // An absent body is "", not "null".
        let Some(body) = body else {
            return String::new();
        };

        match decode_value_bounded(Some(body), self.max_value_depth) {
            PlainValue::String(s) | PlainValue::Int(s) | PlainValue::Bytes(s) => s,
            other => serde_json::to_string(&other).unwrap_or_default(),
        }
    }

    fn decode_attributes(&self, list: Option<&[KeyValue]>) -> PlainMap {
        decode_key_value_list_bounded(list, self.max_value_depth)
    }
}

/// Flatten a request using wall-clock time and the default depth limit.
pub fn transform_logs(request: &ExportLogsRequest) -> Vec<FlatLogRecord> {
    LogsTransformer::new().transform(request)
}

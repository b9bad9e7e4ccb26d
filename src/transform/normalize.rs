// src/transform/normalize.rs
//! Per-field normalization: timestamps, trace/span ids, severity.
//!
//! None of these fail. Malformed input maps to a fixed default so one bad
//! field never drops the surrounding batch.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::decode::otlp::SEVERITY_NAMES;

const NANOS_PER_MILLI: u64 = 1_000_000;

const UNSPECIFIED: &str = SEVERITY_NAMES[0];

/// Lenient like browser `atob`: padding optional, non-zero trailing bits ignored.
const ID_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Render an instant the way the pipeline schema expects it,
/// e.g. `2023-11-14T22:13:20.000Z`.
pub fn format_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse nanosecond text as the unsigned 64-bit value OTLP declares.
/// Negative or out-of-range text is absent.
fn parse_nanos(nanos: Option<&str>) -> Option<u64> {
    nanos?.trim().parse().ok()
}

/// Convert a nanosecond timestamp to an ISO-8601 UTC string at millisecond
/// precision. Absent, empty or unparseable input is absent.
pub fn nano_timestamp_to_iso(nanos: Option<&str>) -> Option<String> {
    let millis = i64::try_from(parse_nanos(nanos)? / NANOS_PER_MILLI).ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis).map(format_iso)
}

/// The raw nanosecond value, or 0 when absent or unparseable. Parses the
/// same way as [`nano_timestamp_to_iso`], so both agree on what is absent.
pub fn nano_timestamp_value(nanos: Option<&str>) -> u64 {
    parse_nanos(nanos).unwrap_or(0)
}

/// Normalize a trace or span id to lowercase hex.
///
/// Text made only of hex digits is returned unchanged, case included.
/// Anything else is read as base64. If that fails too the input is
/// returned as-is.
pub fn identifier_to_hex(id: Option<&str>) -> Option<String> {
    let id = id.filter(|s| !s.is_empty())?;

    // Hex-only text is taken as hex even when the producer meant base64.
    if id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Some(id.to_string());
    }

    match ID_BASE64.decode(id) {
        Ok(bytes) => Some(const_hex::encode(bytes)),
        Err(e) => {
            debug!(id, error = %e, "identifier is neither hex nor base64, keeping as-is");
            Some(id.to_string())
        }
    }
}

/// Resolve the severity label. Producer text always wins; otherwise the
/// number is looked up, with anything unknown mapping to `UNSPECIFIED`.
pub fn resolve_severity(number: Option<i64>, text: Option<&str>) -> String {
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        return text.to_string();
    }

    number
        .and_then(|n| usize::try_from(n).ok())
        .and_then(|n| SEVERITY_NAMES.get(n))
        .copied()
        .unwrap_or(UNSPECIFIED)
        .to_string()
}

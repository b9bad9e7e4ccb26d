// src/decode/mod.rs
//! Request decoding: optional gunzip, UTF-8, then OTLP/JSON.

pub mod otlp;

use bytes::Bytes;
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::{debug, error};

use otlp::ExportLogsRequest;

/// Upper bound for a request body after decompression.
pub const MAX_DECOMPRESSED_SIZE: usize = 10 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug)]
pub enum DecodeError {
    Decompress(String),
    TooLarge(usize),
    Utf8(std::str::Utf8Error),
    Json(serde_json::Error),
    UnexpectedShape(&'static str),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Decompress(e) => write!(f, "gzip decompression failed: {}", e),
            DecodeError::TooLarge(size) => write!(
                f,
                "body of {} bytes exceeds {}MB limit",
                size,
                MAX_DECOMPRESSED_SIZE / 1024 / 1024
            ),
            DecodeError::Utf8(e) => write!(f, "body is not valid UTF-8: {}", e),
            DecodeError::Json(e) => write!(f, "invalid JSON: {}", e),
            DecodeError::UnexpectedShape(kind) => {
                write!(f, "expected a JSON object, got {}", kind)
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Utf8(e) => Some(e),
            DecodeError::Json(e) => Some(e),
            _ => None,
        }
    }
}

/// Whether a body must be gunzipped: declared by `Content-Encoding`, or
/// sniffed from the gzip magic number for producers that omit the header.
pub fn is_gzipped(content_encoding: Option<&str>, body: &[u8]) -> bool {
    let declared = content_encoding
        .map(|v| v.to_ascii_lowercase().contains("gzip"))
        .unwrap_or(false);
    declared || body.starts_with(&GZIP_MAGIC)
}

pub fn decompress_if_gzipped(body: Bytes, is_gzipped: bool) -> Result<Bytes, DecodeError> {
    if !is_gzipped {
        if body.len() > MAX_DECOMPRESSED_SIZE {
            error!(
                bytes_read = body.len(),
                max = MAX_DECOMPRESSED_SIZE,
                "uncompressed body exceeds limit"
            );
            return Err(DecodeError::TooLarge(body.len()));
        }
        return Ok(body);
    }

    debug!(compressed_size = body.len(), "decompressing gzipped body");
    let decoder = GzDecoder::new(body.as_ref());
    let mut decompressed = Vec::with_capacity(body.len().saturating_mul(2));
    let bytes_read = decoder
        .take((MAX_DECOMPRESSED_SIZE + 1) as u64)
        .read_to_end(&mut decompressed)
        .map_err(|e| {
            error!(error = %e, "gzip decompression failed");
            DecodeError::Decompress(e.to_string())
        })?;
    if bytes_read > MAX_DECOMPRESSED_SIZE {
        error!(
            bytes_read,
            max = MAX_DECOMPRESSED_SIZE,
            "decompressed size exceeds limit"
        );
        return Err(DecodeError::TooLarge(bytes_read));
    }
    debug!(decompressed_size = bytes_read, "decompression complete");
    Ok(Bytes::from(decompressed))
}

/// Decode a raw request body into an OTLP logs request.
pub fn decode_logs_request(
    body: Bytes,
    content_encoding: Option<&str>,
) -> Result<ExportLogsRequest, DecodeError> {
    let gzipped = is_gzipped(content_encoding, &body);
    let body = decompress_if_gzipped(body, gzipped)?;
    let text = std::str::from_utf8(&body).map_err(DecodeError::Utf8)?;
    parse_logs_json(text)
}

/// Parse OTLP/JSON logs text. The top level must be an object.
pub fn parse_logs_json(text: &str) -> Result<ExportLogsRequest, DecodeError> {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    match trimmed.as_bytes().first() {
        Some(b'{') => serde_json::from_str(trimmed).map_err(DecodeError::Json),
        Some(b'[') => Err(DecodeError::UnexpectedShape("array")),
        // Anything else is either a scalar or not JSON at all; let serde say which.
        _ => match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => Err(DecodeError::UnexpectedShape(json_type_name(&value))),
            Err(e) => Err(DecodeError::Json(e)),
        },
    }
}

/// Convert an already-parsed JSON document into an OTLP logs request.
pub fn logs_request_from_value(value: serde_json::Value) -> Result<ExportLogsRequest, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::UnexpectedShape(json_type_name(&value)));
    }
    serde_json::from_value(value).map_err(DecodeError::Json)
}

pub(crate) fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const PAYLOAD: &str = r#"{"resourceLogs":[{"scopeLogs":[{"logRecords":[{"body":{"stringValue":"hi"}}]}]}]}"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn detects_gzip_from_header_or_magic() {
        assert!(is_gzipped(Some("gzip"), b"{}"));
        assert!(is_gzipped(Some("GZIP"), b"{}"));
        assert!(is_gzipped(Some("x-gzip"), b"{}"));
        assert!(is_gzipped(None, &[0x1f, 0x8b, 0x08]));
        assert!(!is_gzipped(None, b"{}"));
        assert!(!is_gzipped(Some("identity"), b"{}"));
        assert!(!is_gzipped(None, &[0x1f]));
    }

    #[test]
    fn decodes_plain_json() {
        let request = decode_logs_request(Bytes::from(PAYLOAD), None).unwrap();
        assert_eq!(request.log_record_count(), 1);
    }

    #[test]
    fn decodes_gzip_with_header() {
        let body = gzip(PAYLOAD.as_bytes());
        let request = decode_logs_request(Bytes::from(body), Some("gzip")).unwrap();
        assert_eq!(request.log_record_count(), 1);
    }

    #[test]
    fn decodes_gzip_without_header() {
        let body = gzip(PAYLOAD.as_bytes());
        let request = decode_logs_request(Bytes::from(body), None).unwrap();
        assert_eq!(request.log_record_count(), 1);
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        let mut body = gzip(PAYLOAD.as_bytes());
        body.truncate(12);
        let err = decode_logs_request(Bytes::from(body), Some("gzip")).unwrap_err();
        assert!(matches!(err, DecodeError::Decompress(_)));
    }

    #[test]
    fn rejects_oversized_decompressed_body() {
        let body = gzip(&vec![b' '; MAX_DECOMPRESSED_SIZE + 10]);
        let err = decompress_if_gzipped(Bytes::from(body), true).unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge(_)));
    }

    #[test]
    fn rejects_oversized_plain_body() {
        let body = Bytes::from(vec![b' '; MAX_DECOMPRESSED_SIZE + 1]);
        let err = decompress_if_gzipped(body, false).unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge(_)));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = decode_logs_request(Bytes::from_static(&[b'{', 0xff, b'}']), None).unwrap_err();
        assert!(matches!(err, DecodeError::Utf8(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_logs_json("{\"resourceLogs\": [").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));

        let err = parse_logs_json("not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn rejects_non_object_top_level() {
        assert!(matches!(
            parse_logs_json("[]").unwrap_err(),
            DecodeError::UnexpectedShape("array")
        ));
        assert!(matches!(
            parse_logs_json("null").unwrap_err(),
            DecodeError::UnexpectedShape("null")
        ));
        assert!(matches!(
            logs_request_from_value(serde_json::json!(42)).unwrap_err(),
            DecodeError::UnexpectedShape("number")
        ));
    }

    #[test]
    fn mistyped_fields_do_not_fail_the_request() {
        let request = parse_logs_json(
            r#"{"resourceLogs":[{"scopeLogs":[{"logRecords":[
                {"timeUnixNano":1.7e18,"severityNumber":9.0,"body":{"doubleValue":"NaN"}},
                {"attributes":[{"key":"n","value":{"intValue":1.5}}],"flags":"x"}
            ]}]}]}"#,
        )
        .unwrap();
        assert_eq!(request.log_record_count(), 2);
    }

    #[test]
    fn accepts_empty_object() {
        let request = parse_logs_json("  {}").unwrap();
        assert!(request.resource_logs.is_empty());
    }
}

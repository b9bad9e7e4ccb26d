use bytes::Bytes;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, Span};

use crate::decode::{self, json_type_name, DecodeError};
use crate::pipeline::{PipelineSender, SendError};
use crate::schema::FlatLogRecord;
use crate::transform::{Clock, LogsTransformer};

#[derive(Debug)]
pub enum HandleError {
    Decode(DecodeError),
    UnexpectedPayload(&'static str),
    SendFailed(SendError),
}

impl std::fmt::Display for HandleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleError::Decode(e) => write!(f, "decode error: {}", e),
            HandleError::UnexpectedPayload(kind) => {
                write!(f, "unexpected payload: expected a JSON object, got {}", kind)
            }
            HandleError::SendFailed(e) => write!(f, "send failed: {}", e),
        }
    }
}

impl std::error::Error for HandleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandleError::Decode(e) => Some(e),
            HandleError::SendFailed(e) => Some(e),
            HandleError::UnexpectedPayload(_) => None,
        }
    }
}

impl From<DecodeError> for HandleError {
    fn from(e: DecodeError) -> Self {
        HandleError::Decode(e)
    }
}

impl From<SendError> for HandleError {
    fn from(e: SendError) -> Self {
        HandleError::SendFailed(e)
    }
}

/// Response of the call-style entry point.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub success: bool,
    pub records_written: usize,
}

/// OTLP/HTTP export acknowledgement. Nothing is ever partially rejected.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLogsResponse {
    pub partial_success: PartialSuccess,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSuccess {
    pub rejected_log_records: u64,
    pub error_message: String,
}

impl ExportLogsResponse {
    pub fn accepted() -> Self {
        Self {
            partial_success: PartialSuccess {
                rejected_log_records: 0,
                error_message: String::new(),
            },
        }
    }
}

/// Input to [`write`]: either an already-parsed document or its text.
#[derive(Debug, Clone)]
pub enum WritePayload {
    Json(JsonValue),
    Text(String),
}

impl From<JsonValue> for WritePayload {
    fn from(value: JsonValue) -> Self {
        WritePayload::Json(value)
    }
}

impl From<String> for WritePayload {
    fn from(text: String) -> Self {
        WritePayload::Text(text)
    }
}

impl From<&str> for WritePayload {
    fn from(text: &str) -> Self {
        WritePayload::Text(text.to_string())
    }
}

/// Decode a raw HTTP body, flatten it and hand the records to the sink.
/// Returns the number of records written.
#[tracing::instrument(
    name = "ingest",
    skip(body, transformer, sender),
    fields(
        body_size = body.len(),
        content_encoding = content_encoding.unwrap_or(""),
        records = tracing::field::Empty,
    )
)]
pub async fn handle_logs<C: Clock, S: PipelineSender + ?Sized>(
    body: Bytes,
    content_encoding: Option<&str>,
    transformer: &LogsTransformer<C>,
    sender: &S,
) -> Result<usize, HandleError> {
    let request = decode::decode_logs_request(body, content_encoding).map_err(|e| {
        error!(error = %e, "failed to decode payload");
        HandleError::Decode(e)
    })?;

    let records = transformer.transform(&request);
    Span::current().record("records", records.len());
    deliver(records, sender).await
}

/// Call-style entry point for callers that already hold the payload.
#[tracing::instrument(name = "write", skip_all, fields(records = tracing::field::Empty))]
pub async fn write<C: Clock, S: PipelineSender + ?Sized>(
    payload: WritePayload,
    transformer: &LogsTransformer<C>,
    sender: &S,
) -> Result<WriteResult, HandleError> {
    let request = match payload {
        WritePayload::Json(value) => {
            if !value.is_object() {
                return Err(HandleError::UnexpectedPayload(json_type_name(&value)));
            }
            decode::logs_request_from_value(value)?
        }
        WritePayload::Text(text) => decode::parse_logs_json(&text)?,
    };

    let records = transformer.transform(&request);
    Span::current().record("records", records.len());
    let records_written = deliver(records, sender).await?;

    Ok(WriteResult {
        success: true,
        records_written,
    })
}

async fn deliver<S: PipelineSender + ?Sized>(
    records: Vec<FlatLogRecord>,
    sender: &S,
) -> Result<usize, HandleError> {
    if records.is_empty() {
        debug!("no records to send");
        return Ok(0);
    }

    let count = records.len();
    sender.send(records).await.map_err(|e| {
        error!(error = %e, records = count, "pipeline send failed");
        HandleError::SendFailed(e)
    })?;

    info!(records = count, "request complete");
    Ok(count)
}

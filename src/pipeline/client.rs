// src/pipeline/client.rs
//! HTTP sink for a Cloudflare Pipelines logs stream.

use crate::pipeline::sender::{PipelineSender, SendError};
use crate::schema::FlatLogRecord;
use bytes::{BufMut, Bytes, BytesMut};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipelines reject bodies over 1MB; stay under it with room for headers.
const MAX_BODY_SIZE: usize = 900 * 1024;

/// How often and how patiently one NDJSON body is re-posted after a
/// retryable failure.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total tries per body, the first included. Zero behaves like one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Post once and report the first failure.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// One request body: newline-separated records, no trailing newline.
#[derive(Debug)]
struct NdjsonBatch {
    body: Bytes,
    records: usize,
}

/// HTTP client for a Cloudflare Pipelines logs stream endpoint
pub struct PipelineClient {
    client: Client,
    endpoint: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl PipelineClient {
    /// Create a new client for the given endpoint and optional auth token.
    /// Returns an error if the HTTP client fails to build (e.g., TLS configuration issues).
    pub fn new(endpoint: String, token: Option<String>, timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            endpoint,
            token: token.filter(|t| !t.is_empty()),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post one batch, re-posting the same body while the failure is retryable
    /// and attempts remain.
    async fn deliver_batch(&self, batch: &NdjsonBatch) -> Result<(), SendError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.post(batch.body.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        records = batch.records,
                        error = %e,
                        "pipeline send failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post(&self, body: Bytes) -> Result<(), SendError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/x-ndjson")
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SendError::Timeout
            } else {
                SendError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let resp_body = response
            .text()
            .await
            .unwrap_or_else(|_| "(failed to read body)".to_string());
        error!(
            endpoint = %self.endpoint,
            status = status.as_u16(),
            response_body = %resp_body,
            "pipeline returned error status"
        );
        Err(SendError::Http {
            status: status.as_u16(),
            endpoint: self.endpoint.clone(),
        })
    }
}

#[async_trait::async_trait]
impl PipelineSender for PipelineClient {
    /// Deliver records in order, one request per size-bounded NDJSON body.
    /// Stops at the first body that cannot be delivered.
    #[tracing::instrument(
        name = "pipeline_send",
        skip(self, records),
        fields(
            endpoint = %self.endpoint,
            record_count = records.len(),
        )
    )]
    async fn send(&self, records: Vec<FlatLogRecord>) -> Result<usize, SendError> {
        let batches = encode_batches(&records, MAX_BODY_SIZE)?;
        if batches.len() > 1 {
            debug!(batch_count = batches.len(), "records exceed one body, splitting");
        }

        let mut sent = 0;
        for batch in &batches {
            debug!(bytes = batch.body.len(), records = batch.records, "posting batch");
            self.deliver_batch(batch).await?;
            sent += batch.records;
        }
        debug!(sent, "records delivered");
        Ok(sent)
    }
}

/// Serialize records as NDJSON, closing a body whenever the next line would
/// push it past `max_size`. A record larger than `max_size` goes out alone.
fn encode_batches(
    records: &[FlatLogRecord],
    max_size: usize,
) -> Result<Vec<NdjsonBatch>, SendError> {
    let mut batches = Vec::new();
    let mut buf = BytesMut::new();
    let mut in_batch = 0;

    for record in records {
        let line = serde_json::to_vec(record).map_err(|e| SendError::Serialize(e.to_string()))?;
        if in_batch > 0 && buf.len() + 1 + line.len() > max_size {
            batches.push(NdjsonBatch {
                body: buf.split().freeze(),
                records: in_batch,
            });
            in_batch = 0;
        }
        if in_batch > 0 {
            buf.put_u8(b'\n');
        }
        buf.put_slice(&line);
        in_batch += 1;
    }

    if in_batch > 0 {
        batches.push(NdjsonBatch {
            body: buf.freeze(),
            records: in_batch,
        });
    }
    Ok(batches)
}

// src/pipeline/sender.rs
use crate::schema::FlatLogRecord;

/// Errors that can occur when sending to a pipeline
#[derive(Debug)]
pub enum SendError {
    Timeout,
    Http { status: u16, endpoint: String },
    Network(String),
    Serialize(String),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Timeout => write!(f, "request timed out"),
            SendError::Http { status, endpoint } => {
                write!(f, "HTTP {} from {}", status, endpoint)
            }
            SendError::Network(msg) => write!(f, "network error: {}", msg),
            SendError::Serialize(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for SendError {}

impl SendError {
    /// Timeouts, connection failures and gateway errors are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            SendError::Timeout | SendError::Network(_) => true,
            SendError::Http { status, .. } => matches!(status, 502..=504),
            SendError::Serialize(_) => false,
        }
    }
}

/// Durable destination for flattened records (abstracts the HTTP client).
///
/// Only called with a non-empty batch. Returns the number of records accepted.
#[async_trait::async_trait]
pub trait PipelineSender: Send + Sync {
    async fn send(&self, records: Vec<FlatLogRecord>) -> Result<usize, SendError>;
}

// src/pipeline/mod.rs
pub mod client;
pub mod sender;

pub use client::{PipelineClient, RetryPolicy, DEFAULT_SEND_TIMEOUT};
pub use sender::{PipelineSender, SendError};

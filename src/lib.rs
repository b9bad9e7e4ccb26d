// src/lib.rs
pub mod cli;
pub mod convert;
pub mod decode;
pub mod handler;
pub mod native;
pub mod pipeline;
pub mod schema;
pub mod transform;

// Re-export tracing for use in other modules
pub use tracing;

pub use bytes::Bytes;
pub use convert::{decode_key_value_list, decode_value, PlainMap, PlainValue};
pub use decode::otlp::ExportLogsRequest;
pub use decode::{decode_logs_request, DecodeError};
pub use handler::{
    handle_logs, write, ExportLogsResponse, HandleError, WritePayload, WriteResult,
};
pub use native::build_router;
pub use pipeline::{PipelineClient, PipelineSender, SendError};
pub use schema::FlatLogRecord;
pub use transform::{transform_logs, Clock, FixedClock, LogsTransformer, SystemClock};

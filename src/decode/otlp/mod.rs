pub mod common;
pub mod logs;

pub use common::{AnyValue, KeyValue};
pub use logs::{
    severity_number_from_name, ExportLogsRequest, InstrumentationScope, LogRecord, Resource,
    ResourceLogs, ScopeLogs, SEVERITY_NAMES,
};

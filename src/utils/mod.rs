//! Utility modules

pub mod error;
pub mod logger;

pub use error::{ConnectionError, Error, ErrorKind, ErrorReport, Result};
pub use logger::{redact, LogRecord, LogSink, Logger, MemorySink, TracingSink, REDACTION_MARKER};

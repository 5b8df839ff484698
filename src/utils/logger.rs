//! Injected logger with redaction
//!
//! Components receive a [`Logger`] at construction instead of reaching for
//! process-wide state. Every message is passed through [`redact`] before it
//! reaches the sink.

use std::borrow::Cow;
use std::sync::{Arc, Mutex};

use tracing::Level;

/// Marker that replaces any message suspected of carrying secrets
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Lower-case keywords that trigger redaction
const SENSITIVE_KEYWORDS: &[&str] = &[
    "password",
    "passwd",
    "pwd",
    "secret",
    "token",
    "bearer",
    "authorization",
    "api_key",
    "api-key",
    "apikey",
    "api key",
    "private_key",
    "private-key",
    "privatekey",
    "private key",
    "-----begin",
];

/// Replace the whole message with [`REDACTION_MARKER`] if it contains a
/// sensitive keyword (case-insensitive). Idempotent.
pub fn redact(message: &str) -> Cow<'_, str> {
    if is_sensitive(message) {
        Cow::Borrowed(REDACTION_MARKER)
    } else {
        Cow::Borrowed(message)
    }
}

pub fn is_sensitive(message: &str) -> bool {
    let lower = message.to_lowercase();
    SENSITIVE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Destination for sanitized log records
pub trait LogSink: Send + Sync {
    fn write(&self, level: Level, module: &str, message: &str);
}

/// Forwards records to `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: Level, module: &str, message: &str) {
        match level {
            Level::ERROR => tracing::error!(module, "{}", message),
            Level::WARN => tracing::warn!(module, "{}", message),
            Level::INFO => tracing::info!(module, "{}", message),
            Level::DEBUG => tracing::debug!(module, "{}", message),
            Level::TRACE => tracing::trace!(module, "{}", message),
        }
    }
}

/// One captured record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub module: String,
    pub message: String,
}

/// Captures records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: Level, module: &str, message: &str) {
        let record = LogRecord {
            level,
            module: module.to_string(),
            message: message.to_string(),
        };
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

/// Cheaply cloneable handle to a log sink
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Logger backed by `tracing`
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    pub fn log(&self, level: Level, module: &str, message: &str) {
        self.sink.write(level, module, &redact(message));
    }

    pub fn redacts(&self, message: &str) -> bool {
        is_sensitive(message)
    }

    pub fn error(&self, module: &str, message: &str) {
        self.log(Level::ERROR, module, message);
    }

    pub fn warn(&self, module: &str, message: &str) {
        self.log(Level::WARN, module, message);
    }

    pub fn info(&self, module: &str, message: &str) {
        self.log(Level::INFO, module, message);
    }

    pub fn debug(&self, module: &str, message: &str) {
        self.log(Level::DEBUG, module, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

//! Error types for cluster-connect

use std::fmt;
use std::io;
use thiserror::Error;

/// Top-level error taxonomy
///
/// Validation kinds are produced while building configuration; only
/// `ConnectionFailed` is produced by `connect`, `ping` and `info`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required credential: {0}")]
    MissingRequiredCredential(String),

    #[error("Missing required configuration: {0}")]
    MissingRequiredConfig(String),

    #[error("Invalid edition: {0}")]
    InvalidEdition(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(#[from] ConnectionError),

    #[error("Operation unsupported: {0}")]
    OperationUnsupported(String),

    #[error("TLS unavailable: {0}")]
    TlsUnavailable(String),
}

/// Discriminant of [`Error`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingRequiredCredential,
    MissingRequiredConfig,
    InvalidEdition,
    ConnectionFailed,
    OperationUnsupported,
    TlsUnavailable,
}

/// Transport-level failures, surfaced to callers as `Error::ConnectionFailed`
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        source: io::Error,
    },

    #[error("No addresses resolved for {host}:{port}")]
    NoAddress { host: String, port: u16 },

    #[error("Endpoint has no hosts")]
    NoHosts,

    #[error("Read timed out after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TLS handshake failed: {0}")]
    TlsFailed(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingRequiredCredential(_) => ErrorKind::MissingRequiredCredential,
            Error::MissingRequiredConfig(_) => ErrorKind::MissingRequiredConfig,
            Error::InvalidEdition(_) => ErrorKind::InvalidEdition,
            Error::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
            Error::OperationUnsupported(_) => ErrorKind::OperationUnsupported,
            Error::TlsUnavailable(_) => ErrorKind::TlsUnavailable,
        }
    }

    /// Human-readable rendering for operators
    pub fn report(&self) -> ErrorReport {
        let (title, hint) = match self.kind() {
            ErrorKind::MissingRequiredCredential => (
                "Missing credential",
                "Set both the user and the password, or neither.",
            ),
            ErrorKind::MissingRequiredConfig => (
                "Invalid configuration",
                "Check the endpoint host list and that numeric settings are unsigned integers.",
            ),
            ErrorKind::InvalidEdition => (
                "Invalid edition",
                "Set the edition to exactly \"community\" or \"enterprise\".",
            ),
            ErrorKind::ConnectionFailed => (
                "Connection failed",
                "Verify the cluster is reachable, or raise the connect/read timeouts.",
            ),
            ErrorKind::OperationUnsupported => (
                "Operation unsupported",
                "Call connect() successfully before issuing commands.",
            ),
            ErrorKind::TlsUnavailable => (
                "TLS unavailable",
                "Provide CA, cert and key files, or build with the native-tls-backend feature.",
            ),
        };

        ErrorReport {
            title: title.to_string(),
            detail: self.to_string(),
            hint: hint.to_string(),
        }
    }
}

/// Title, detail and remediation hint for an [`Error`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ErrorReport {
    pub title: String,
    pub detail: String,
    pub hint: String,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "  {}", self.detail)?;
        write!(f, "  hint: {}", self.hint)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

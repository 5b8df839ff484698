//! TLS configuration

use std::path::PathBuf;

/// TLS material for one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub ca_file: PathBuf,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    /// Name verified against the server certificate; falls back to the host
    pub tls_name: Option<String>,
}

impl TlsConfig {
    pub fn new(
        ca_file: impl Into<PathBuf>,
        cert_file: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ca_file: ca_file.into(),
            cert_file: cert_file.into(),
            key_file: key_file.into(),
            tls_name: None,
        }
    }

    /// Name to present for SNI and hostname verification
    pub fn server_name<'a>(&'a self, host: &'a str) -> &'a str {
        self.tls_name.as_deref().unwrap_or(host)
    }
}

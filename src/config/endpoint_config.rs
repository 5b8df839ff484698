//! Endpoint descriptor
//!
//! One reachable cluster address: an ordered host list sharing a port,
//! timeouts, an optional cluster name and optional TLS material.
//! Validation is pure; reachability is only discovered at connect time.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use super::source::{lookup_trimmed, ConfigSource};
use super::tls_config::TlsConfig;
use crate::utils::{Error, Result};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5000;

/// Which side of the failover pair an endpoint serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Active,
    Passive,
}

impl EndpointRole {
    /// Key segment used in configuration names
    pub fn key_segment(&self) -> &'static str {
        match self {
            EndpointRole::Active => "ACTIVE",
            EndpointRole::Passive => "PASSIVE",
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Active => f.write_str("active"),
            EndpointRole::Passive => f.write_str("passive"),
        }
    }
}

/// Validated endpoint descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub role: EndpointRole,
    pub hosts: Vec<String>,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub cluster_name: Option<String>,
    pub tls: Option<TlsConfig>,
}

impl EndpointConfig {
    /// Descriptor with default port and timeouts
    pub fn new<I, S>(role: EndpointRole, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role,
            hosts: hosts.into_iter().map(Into::into).collect(),
            port: DEFAULT_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            cluster_name: None,
            tls: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    pub fn with_read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    pub fn with_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = Some(name.into());
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Read `{prefix}_HOSTS`, `{prefix}_PORT`, ... from `source` and validate
    pub fn from_source(
        source: &dyn ConfigSource,
        prefix: &str,
        role: EndpointRole,
    ) -> Result<Self> {
        let key = |name: &str| format!("{}_{}", prefix, name);

        let hosts_key = key("HOSTS");
        let hosts = lookup_trimmed(source, &hosts_key)
            .map(|raw| parse_hosts(&raw))
            .unwrap_or_default();
        if hosts.is_empty() {
            return Err(Error::MissingRequiredConfig(format!(
                "{} must list at least one host",
                hosts_key
            )));
        }

        let port = parse_or(source, &key("PORT"), DEFAULT_PORT)?;
        let connect_timeout_ms =
            parse_or(source, &key("CONNECT_TIMEOUT_MS"), DEFAULT_CONNECT_TIMEOUT_MS)?;
        let read_timeout_ms = parse_or(source, &key("READ_TIMEOUT_MS"), DEFAULT_READ_TIMEOUT_MS)?;
        let cluster_name = lookup_trimmed(source, &key("CLUSTER_NAME"));

        let tls_enabled = match lookup_trimmed(source, &key("TLS_ENABLED")) {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                Error::MissingRequiredConfig(format!(
                    "{} must be a boolean, got {:?}",
                    key("TLS_ENABLED"),
                    raw
                ))
            })?,
            None => false,
        };

        // Path keys are only consulted when TLS is enabled
        let tls = if tls_enabled {
            let require = |name: &str| {
                let k = key(name);
                lookup_trimmed(source, &k).ok_or_else(|| {
                    Error::TlsUnavailable(format!("TLS is enabled but {} is not set", k))
                })
            };
            let mut tls = TlsConfig::new(
                require("TLS_CA_FILE")?,
                require("TLS_CERT_FILE")?,
                require("TLS_KEY_FILE")?,
            );
            tls.tls_name = cluster_name.clone();
            Some(tls)
        } else {
            None
        };

        let endpoint = Self {
            role,
            hosts,
            port,
            connect_timeout_ms,
            read_timeout_ms,
            cluster_name,
            tls,
        };
        endpoint.validate()?;
        Ok(endpoint)
    }

    /// Check structural invariants. Performs no I/O.
    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() || self.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(Error::MissingRequiredConfig(format!(
                "{} endpoint needs a non-empty host list",
                self.role
            )));
        }
        if self.port == 0 {
            return Err(Error::MissingRequiredConfig(format!(
                "{} endpoint port must be non-zero",
                self.role
            )));
        }
        if self.connect_timeout_ms == 0 || self.read_timeout_ms == 0 {
            return Err(Error::MissingRequiredConfig(format!(
                "{} endpoint timeouts must be non-zero",
                self.role
            )));
        }

        if let Some(ref tls) = self.tls {
            let missing = [
                ("CA file", &tls.ca_file),
                ("certificate file", &tls.cert_file),
                ("key file", &tls.key_file),
            ]
            .into_iter()
            .find(|(_, path)| path.as_os_str().is_empty());

            if let Some((what, _)) = missing {
                return Err(Error::TlsUnavailable(format!(
                    "{} endpoint enables TLS without a {}",
                    self.role, what
                )));
            }
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// `host:port` list for display
    pub fn addresses(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|h| format!("{}:{}", h, self.port))
            .collect()
    }
}

/// Split a comma-separated host list, dropping blank entries
pub fn parse_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<T: FromStr>(source: &dyn ConfigSource, key: &str, default: T) -> Result<T> {
    match lookup_trimmed(source, key) {
        Some(raw) => raw.parse().map_err(|_| {
            Error::MissingRequiredConfig(format!(
                "{} must be an unsigned integer in range, got {:?}",
                key, raw
            ))
        }),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

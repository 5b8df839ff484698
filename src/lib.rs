//! cluster-connect library
//!
//! Resolves the cluster edition, endpoints and credentials from a key-value
//! configuration source and connects with active/passive failover over the
//! line-oriented info protocol.
//!
//! ```ignore
//! use cluster_connect::{Client, ClientConfig, EnvSource, LoadOptions, Logger};
//!
//! let logger = Logger::tracing();
//! let config = ClientConfig::from_source(&EnvSource, None, &LoadOptions::default(), &logger)?;
//! let mut client = Client::init(config, logger)?;
//! client.connect()?;
//! assert!(client.ping()?);
//! client.close();
//! ```

pub mod client;
pub mod config;
pub mod utils;

pub use client::{Client, ClientState, InfoTransport, TcpInfoTransport};
pub use config::{
    ClientConfig, ConfigSource, Credentials, Edition, EndpointConfig, EndpointRole, EnvSource,
    LoadOptions, SecretsFile, TlsConfig,
};
pub use utils::{ConnectionError, Error, ErrorKind, ErrorReport, Logger, Result};

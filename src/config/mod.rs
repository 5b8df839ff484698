//! Configuration module

pub mod cli;
pub mod client_config;
pub mod credentials;
pub mod edition;
pub mod endpoint_config;
pub mod source;
pub mod tls_config;

pub use cli::CliArgs;
pub use client_config::{ClientConfig, LoadOptions, DEFAULT_KEY_PREFIX};
pub use credentials::Credentials;
pub use edition::{detect_edition, detect_edition_from, detect_edition_or, Edition};
pub use endpoint_config::{
    EndpointConfig, EndpointRole, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_PORT,
    DEFAULT_READ_TIMEOUT_MS,
};
pub use source::{ConfigSource, EnvSource, SecretsError, SecretsFile};
pub use tls_config::TlsConfig;

//! Client configuration derived from a key-value source

use super::credentials::Credentials;
use super::edition::{detect_edition_from, detect_edition_or, Edition};
use super::endpoint_config::{EndpointConfig, EndpointRole};
use super::source::{lookup_trimmed, ConfigSource};
use crate::utils::{Error, Logger, Result};

/// Default prefix for configuration keys
pub const DEFAULT_KEY_PREFIX: &str = "CLUSTER";

const MODULE: &str = "config";

/// Everything a [`crate::client::Client`] needs
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub edition: Edition,
    pub active: EndpointConfig,
    pub passive: Option<EndpointConfig>,
    pub credentials: Credentials,
}

/// Options for [`ClientConfig::from_source`]
#[derive(Debug, Clone)]
pub struct LoadOptions<'a> {
    /// Key prefix, e.g. `CLUSTER` for `CLUSTER_ACTIVE_HOSTS`
    pub prefix: &'a str,
    /// Edition used only when `{prefix}_EDITION` is absent
    pub default_edition: Option<Edition>,
}

impl Default for LoadOptions<'_> {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX,
            default_edition: None,
        }
    }
}

impl ClientConfig {
    /// Build from parts, validating the active endpoint
    pub fn new(edition: Edition, active: EndpointConfig) -> Result<Self> {
        check_endpoint(&active, EndpointRole::Active)?;
        Ok(Self {
            edition,
            active,
            passive: None,
            credentials: Credentials::none(),
        })
    }

    pub fn with_passive(mut self, passive: EndpointConfig) -> Result<Self> {
        check_endpoint(&passive, EndpointRole::Passive)?;
        self.passive = Some(passive);
        Ok(self)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        self.credentials = credentials;
        Ok(self)
    }

    /// Resolve edition, endpoints and credentials eagerly
    ///
    /// Credentials come from `secrets` when given, otherwise from `source`.
    pub fn from_source(
        source: &dyn ConfigSource,
        secrets: Option<&dyn ConfigSource>,
        options: &LoadOptions<'_>,
        logger: &Logger,
    ) -> Result<Self> {
        let prefix = options.prefix;
        let edition_key = format!("{}_EDITION", prefix);
        let edition = match options.default_edition {
            Some(default) => detect_edition_or(source, &edition_key, default)?,
            None => detect_edition_from(source, &edition_key)?,
        };

        let active = EndpointConfig::from_source(
            source,
            &format!("{}_{}", prefix, EndpointRole::Active.key_segment()),
            EndpointRole::Active,
        )?;

        let passive_prefix = format!("{}_{}", prefix, EndpointRole::Passive.key_segment());
        let passive = if lookup_trimmed(source, &format!("{}_HOSTS", passive_prefix)).is_some() {
            Some(EndpointConfig::from_source(
                source,
                &passive_prefix,
                EndpointRole::Passive,
            )?)
        } else {
            None
        };

        let credentials = match secrets {
            Some(secrets) => Credentials::from_secrets_source(secrets, prefix)?,
            None => Credentials::from_config(source, prefix)?,
        };

        logger.info(
            MODULE,
            &format!(
                "edition={} active=[{}] passive=[{}] tls={} auth={}",
                edition,
                active.addresses().join(","),
                passive
                    .as_ref()
                    .map(|p| p.addresses().join(","))
                    .unwrap_or_default(),
                active.tls_enabled(),
                credentials.is_present(),
            ),
        );
        if let Some(ref name) = active.cluster_name {
            logger.debug(MODULE, &format!("active cluster name {}", name));
        }

        Ok(Self {
            edition,
            active,
            passive,
            credentials,
        })
    }

    /// Re-check every invariant, for configs assembled field by field
    pub fn validate(&self) -> Result<()> {
        check_endpoint(&self.active, EndpointRole::Active)?;
        if let Some(ref passive) = self.passive {
            check_endpoint(passive, EndpointRole::Passive)?;
        }
        self.credentials.validate()
    }

    pub fn endpoint(&self, role: EndpointRole) -> Option<&EndpointConfig> {
        match role {
            EndpointRole::Active => Some(&self.active),
            EndpointRole::Passive => self.passive.as_ref(),
        }
    }

    /// Active endpoint followed by the passive one, if configured
    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointConfig> {
        std::iter::once(&self.active).chain(self.passive.iter())
    }
}

fn check_endpoint(endpoint: &EndpointConfig, expected: EndpointRole) -> Result<()> {
    if endpoint.role != expected {
        return Err(Error::MissingRequiredConfig(format!(
            "{} endpoint slot holds a descriptor labelled {}",
            expected, endpoint.role
        )));
    }
    endpoint.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{ErrorKind, MemorySink, REDACTION_MARKER};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(map: &HashMap<String, String>) -> Result<ClientConfig> {
        ClientConfig::from_source(map, None, &LoadOptions::default(), &Logger::default())
    }

    #[test]
    fn test_active_only() {
        let cfg = load(&source(&[
            ("CLUSTER_EDITION", "community"),
            ("CLUSTER_ACTIVE_HOSTS", "a1,a2"),
        ]))
        .unwrap();

        assert_eq!(cfg.edition, Edition::Community);
        assert_eq!(cfg.active.hosts, vec!["a1", "a2"]);
        assert_eq!(cfg.active.role, EndpointRole::Active);
        assert!(cfg.passive.is_none());
        assert!(!cfg.credentials.is_present());
        assert_eq!(cfg.endpoints().count(), 1);
    }

    #[test]
    fn test_active_and_passive() {
        let cfg = load(&source(&[
            ("CLUSTER_EDITION", "enterprise"),
            ("CLUSTER_ACTIVE_HOSTS", "a1"),
            ("CLUSTER_PASSIVE_HOSTS", "p1"),
            ("CLUSTER_PASSIVE_PORT", "3100"),
            ("CLUSTER_USER", "admin"),
            ("CLUSTER_PASSWORD", "pw"),
        ]))
        .unwrap();

        let passive = cfg.endpoint(EndpointRole::Passive).unwrap();
        assert_eq!(passive.port, 3100);
        assert_eq!(passive.role, EndpointRole::Passive);
        assert!(cfg.credentials.is_present());
        assert_eq!(cfg.endpoints().count(), 2);
    }

    #[test]
    fn test_invalid_passive_fails_eagerly() {
        let err = load(&source(&[
            ("CLUSTER_EDITION", "community"),
            ("CLUSTER_ACTIVE_HOSTS", "a1"),
            ("CLUSTER_PASSIVE_HOSTS", " , "),
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredConfig);

        let err = load(&source(&[
            ("CLUSTER_EDITION", "community"),
            ("CLUSTER_ACTIVE_HOSTS", "a1"),
            ("CLUSTER_PASSIVE_HOSTS", "p1"),
            ("CLUSTER_PASSIVE_TLS_ENABLED", "true"),
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TlsUnavailable);
    }

    #[test]
    fn test_edition_required_unless_defaulted() {
        let map = source(&[("CLUSTER_ACTIVE_HOSTS", "a1")]);
        assert_eq!(load(&map).unwrap_err().kind(), ErrorKind::InvalidEdition);

        let options = LoadOptions {
            default_edition: Some(Edition::Enterprise),
            ..LoadOptions::default()
        };
        let cfg = ClientConfig::from_source(&map, None, &options, &Logger::default()).unwrap();
        assert_eq!(cfg.edition, Edition::Enterprise);
    }

    #[test]
    fn test_custom_prefix_and_secrets() {
        let map = source(&[("DB_EDITION", "community"), ("DB_ACTIVE_HOSTS", "a1")]);
        let secrets = source(&[("DB_USER", "svc"), ("DB_PASSWORD", "pw")]);
        let options = LoadOptions {
            prefix: "DB",
            default_edition: None,
        };

        let secrets: &dyn ConfigSource = &secrets;
        let cfg = ClientConfig::from_source(&map, Some(secrets), &options, &Logger::default())
            .unwrap();
        assert_eq!(cfg.credentials.user(), Some("svc"));
    }

    #[test]
    fn test_credential_values_never_logged() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(sink.clone());
        let map = source(&[
            ("CLUSTER_EDITION", "community"),
            ("CLUSTER_ACTIVE_HOSTS", "a1"),
            ("CLUSTER_USER", "admin"),
            ("CLUSTER_PASSWORD", "hunter2"),
        ]);

        ClientConfig::from_source(&map, None, &LoadOptions::default(), &logger).unwrap();
        for record in sink.records() {
            assert!(!record.message.contains("hunter2"));
            assert_ne!(record.message, REDACTION_MARKER);
        }
    }

    #[test]
    fn test_builder_validates() {
        let active = EndpointConfig::new(EndpointRole::Active, ["a1"]);
        let empty: [&str; 0] = [];
        let err = ClientConfig::new(Edition::Community, active)
            .unwrap()
            .with_passive(EndpointConfig::new(EndpointRole::Passive, empty))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredConfig);
    }

    #[test]
    fn test_role_mismatch_rejected() {
        let err = ClientConfig::new(
            Edition::Community,
            EndpointConfig::new(EndpointRole::Passive, ["a1"]),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredConfig);

        let err = ClientConfig::new(
            Edition::Community,
            EndpointConfig::new(EndpointRole::Active, ["a1"]),
        )
        .unwrap()
        .with_passive(EndpointConfig::new(EndpointRole::Active, ["p1"]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredConfig);
    }

    #[test]
    fn test_validate_struct_literal() {
        let empty: Vec<String> = Vec::new();
        let cfg = ClientConfig {
            edition: Edition::Community,
            active: EndpointConfig::new(EndpointRole::Active, empty),
            passive: None,
            credentials: Credentials::none(),
        };
        assert_eq!(cfg.validate().unwrap_err().kind(), ErrorKind::MissingRequiredConfig);
    }
}

//! User/password credentials

use std::fmt;
use std::path::Path;

use super::source::{lookup_trimmed, lookup_verbatim, ConfigSource, SecretsFile};
use crate::utils::{Error, Result};

/// Optional user/password pair. Both are set or neither is.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    user: Option<String>,
    password: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let creds = Self {
            user: Some(user.into()),
            password: Some(password.into()),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Read `{prefix}_USER` and `{prefix}_PASSWORD` from configuration
    pub fn from_config(source: &dyn ConfigSource, prefix: &str) -> Result<Self> {
        let creds = Self {
            user: lookup_trimmed(source, &format!("{}_USER", prefix)),
            password: lookup_verbatim(source, &format!("{}_PASSWORD", prefix)),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Same keys as [`Credentials::from_config`], read from a secrets store
    pub fn from_secrets_source(secrets: &dyn ConfigSource, prefix: &str) -> Result<Self> {
        Self::from_config(secrets, prefix)
    }

    /// Open and parse a secrets file, then resolve credentials from it
    pub fn from_secrets_file(path: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let path = path.as_ref();
        let secrets = SecretsFile::open(path).map_err(|e| {
            Error::MissingRequiredCredential(format!(
                "secrets file {} unusable: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_secrets_source(&secrets, prefix)
    }

    pub fn validate(&self) -> Result<()> {
        match (&self.user, &self.password) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            (Some(_), None) => Err(Error::MissingRequiredCredential(
                "user is set but password is not".to_string(),
            )),
            (None, Some(_)) => Err(Error::MissingRequiredCredential(
                "password is set but user is not".to_string(),
            )),
        }
    }

    pub fn is_present(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

//! Cluster edition resolution

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::source::ConfigSource;
use crate::utils::{Error, Result};

/// Cluster edition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    Community,
    Enterprise,
}

impl Edition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edition::Community => "community",
            Edition::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Edition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        detect_edition(s)
    }
}

/// Map a raw configuration value to an [`Edition`]. Case-sensitive, no trimming.
pub fn detect_edition(raw: &str) -> Result<Edition> {
    match raw {
        "community" => Ok(Edition::Community),
        "enterprise" => Ok(Edition::Enterprise),
        other => Err(Error::InvalidEdition(format!(
            "{:?} (expected \"community\" or \"enterprise\")",
            other
        ))),
    }
}

/// Resolve a required edition key
pub fn detect_edition_from(source: &dyn ConfigSource, key: &str) -> Result<Edition> {
    match source.lookup(key) {
        Some(raw) => detect_edition(&raw),
        None => Err(Error::InvalidEdition(format!("{} is not set", key))),
    }
}

/// Resolve an edition key, using `default` only when the key is absent
pub fn detect_edition_or(
    source: &dyn ConfigSource,
    key: &str,
    default: Edition,
) -> Result<Edition> {
    match source.lookup(key) {
        Some(raw) => detect_edition(&raw),
        None => Ok(default),
    }
}

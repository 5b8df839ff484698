//! Key-value configuration sources
//!
//! Configuration and secrets are both read through [`ConfigSource`], so the
//! resolvers do not care whether values come from the environment, a
//! secrets file or a map built in a test.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

/// Read-only key lookup
pub trait ConfigSource {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}

/// Secrets file errors
#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("Failed to read secrets file: {0}")]
    Read(#[from] io::Error),

    #[error("Malformed secrets entry on line {line}")]
    Malformed { line: usize },
}

/// Line-oriented `key=value` secrets store
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is
/// stripped and values may be wrapped in single or double quotes.
#[derive(Debug, Default, Clone)]
pub struct SecretsFile {
    entries: HashMap<String, String>,
}

impl SecretsFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SecretsError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, SecretsError> {
        let mut entries = HashMap::new();

        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);

            let (key, value) = line
                .split_once('=')
                .ok_or(SecretsError::Malformed { line: idx + 1 })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(SecretsError::Malformed { line: idx + 1 });
            }

            entries.insert(key.to_string(), unquote(value.trim()).to_string());
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConfigSource for SecretsFile {
    fn lookup(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Trimmed value, with blank treated as absent
pub(crate) fn lookup_trimmed(source: &dyn ConfigSource, key: &str) -> Option<String> {
    source
        .lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Value exactly as stored, with blank treated as absent
pub(crate) fn lookup_verbatim(source: &dyn ConfigSource, key: &str) -> Option<String> {
    source.lookup(key).filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_secrets() {
        let secrets = SecretsFile::parse(
            "# cluster credentials\n\
             \n\
             CLUSTER_USER=admin\n\
             export CLUSTER_PASSWORD=\"p@ss=word\"\n\
             OTHER = 'quoted'\n",
        )
        .unwrap();

        assert_eq!(secrets.len(), 3);
        assert_eq!(secrets.lookup("CLUSTER_USER").as_deref(), Some("admin"));
        assert_eq!(secrets.lookup("CLUSTER_PASSWORD").as_deref(), Some("p@ss=word"));
        assert_eq!(secrets.lookup("OTHER").as_deref(), Some("quoted"));
        assert_eq!(secrets.lookup("MISSING"), None);
    }

    #[test]
    fn test_parse_malformed_line() {
        let err = SecretsFile::parse("A=1\nnot a pair\n").unwrap_err();
        assert!(matches!(err, SecretsError::Malformed { line: 2 }));

        let err = SecretsFile::parse("=value\n").unwrap_err();
        assert!(matches!(err, SecretsError::Malformed { line: 1 }));
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "KEY=value").unwrap();

        let secrets = SecretsFile::open(file.path()).unwrap();
        assert_eq!(secrets.lookup("KEY").as_deref(), Some("value"));
    }

    #[test]
    fn test_lookup_trimmed_treats_blank_as_absent() {
        let mut map = HashMap::new();
        map.insert("A".to_string(), "  ".to_string());
        map.insert("B".to_string(), " x ".to_string());

        assert_eq!(lookup_trimmed(&map, "A"), None);
        assert_eq!(lookup_trimmed(&map, "B").as_deref(), Some("x"));
        assert_eq!(lookup_trimmed(&map, "C"), None);

        assert_eq!(lookup_verbatim(&map, "A"), None);
        assert_eq!(lookup_verbatim(&map, "B").as_deref(), Some(" x "));
    }
}

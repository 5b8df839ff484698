//! Command-line argument parsing
//!
//! Endpoint, edition and credential settings come from the environment;
//! the command line only selects the key prefix, an optional secrets file
//! and what to run after connecting.

use clap::Parser;
use std::path::PathBuf;

use super::client_config::DEFAULT_KEY_PREFIX;
use super::edition::Edition;

/// Connect to a cluster with active/passive failover and check its health
#[derive(Parser, Debug, Clone)]
#[command(name = "cluster-connect")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Prefix of the configuration keys (e.g. CLUSTER -> CLUSTER_ACTIVE_HOSTS)
    #[arg(long = "prefix", default_value = DEFAULT_KEY_PREFIX)]
    pub prefix: String,

    /// Read user/password from a key=value secrets file instead of the environment
    #[arg(long = "secrets-file")]
    pub secrets_file: Option<PathBuf>,

    /// Edition to assume when <PREFIX>_EDITION is not set
    #[arg(long = "edition", value_parser = parse_edition)]
    pub default_edition: Option<Edition>,

    /// Info command to run against the selected endpoint after connecting
    #[arg(long = "command")]
    pub command: Option<String>,

    /// Print the report as JSON
    #[arg(long = "json")]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

fn parse_edition(raw: &str) -> Result<Edition, String> {
    raw.parse::<Edition>().map_err(|e| e.to_string())
}

impl CliArgs {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.prefix.trim().is_empty() {
            return Err("--prefix must not be empty".to_string());
        }
        if let Some(ref cmd) = self.command {
            if cmd.trim().is_empty() || cmd.contains('\n') {
                return Err("--command must be a single non-empty line".to_string());
            }
        }
        Ok(())
    }
}

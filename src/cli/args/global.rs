//! Global CLI options shared across all commands

use crate::cli::{Cli, OutputFormat};

/// Global flags, resolved once after parsing and handed to each command.
///
/// Precedence is CLI flag > environment variable > default; the config file
/// itself holds no global options.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format (table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.evpoll/config.yaml)
    pub config: Option<String>,
}

impl GlobalOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }
}

//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod args;
pub mod login;
pub mod status;

pub use args::{GlobalOptions, OutputFormat};

/// evpoll - read battery state from connected vehicles
#[derive(Parser, Debug)]
#[command(name = "evpoll")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "EVPOLL_FORMAT",
        default_value = "table",
        hide_env = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "EVPOLL_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "EVPOLL_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show battery state of configured vehicles
    Status {
        /// Only show the vehicle with this title
        #[arg(long)]
        vehicle: Option<String>,
    },

    /// Log in to a Tesla account and print tokens for the config file
    Login,

    /// Display version information
    Version,
}

//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One row per vehicle
    #[default]
    Table,
    /// Structured output with metadata, for scripts
    Json,
}

//! JSON output formatting

use chrono::Utc;
use serde::Serialize;

/// Wrapper for JSON output with metadata
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a, T> {
    pub data: &'a [T],
    pub meta: Metadata,
}

/// Metadata included in JSON output
#[derive(Debug, Serialize)]
pub struct Metadata {
    /// When the report was rendered (RFC 3339)
    pub timestamp: String,

    /// CLI version
    pub version: String,

    /// Number of entries in `data`
    pub count: usize,
}

impl<'a, T> JsonOutput<'a, T> {
    pub fn new(data: &'a [T]) -> Self {
        Self {
            data,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                count: data.len(),
            },
        }
    }
}

/// Format a list as pretty-printed JSON under `data`, with `meta`
pub fn format_json<T: Serialize>(data: &[T]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(data))
}

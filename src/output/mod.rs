//! Output formatting for CLI results

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::models::{VehicleReport, VehicleStatusDisplay};

pub mod json;
pub mod table;

/// Render vehicle reports in the requested format
pub fn format_reports(reports: &[VehicleReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<VehicleStatusDisplay> =
                reports.iter().map(VehicleStatusDisplay::from).collect();
            Ok(table::format_table(&rows))
        }
        OutputFormat::Json => Ok(json::format_json(reports)?),
    }
}

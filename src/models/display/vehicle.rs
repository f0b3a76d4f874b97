//! Vehicle status display model

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use super::common::{format_local_time, truncate_string};
use crate::error::{Error, Result};
use crate::vehicle::{ChargeStatus, Vehicle};

const ERROR_CELL_WIDTH: usize = 32;

/// Outcome of one vehicle read
///
/// Serializes as the bare value, `null` when not available, or
/// `{"error": "..."}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading<T> {
    Value(T),
    /// Not supported by the vehicle, or currently meaningless
    NotAvailable,
    Failed { error: String },
}

impl<T> Reading<T> {
    /// Classify a read result; failures are logged with `title` as context
    pub fn from_result(title: &str, what: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Reading::Value(value),
            Err(err) if err.is_not_available() => Reading::NotAvailable,
            Err(err) => {
                log::warn!("{}: reading {} failed: {}", title, what, err);
                Reading::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    fn cell(&self, render: impl FnOnce(&T) -> String) -> String {
        match self {
            Reading::Value(value) => render(value),
            Reading::NotAvailable => "-".to_string(),
            Reading::Failed { error } => format!("⚠ {}", truncate_string(error, ERROR_CELL_WIDTH)),
        }
    }
}

/// Everything known about one vehicle at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct VehicleReport {
    pub title: String,
    pub capacity: i64,
    pub soc: Reading<f64>,
    pub status: Reading<ChargeStatus>,
    pub range: Reading<i64>,
    pub finish_time: Reading<DateTime<Utc>>,
}

impl VehicleReport {
    /// Read every capability the vehicle offers
    pub async fn collect(vehicle: &dyn Vehicle) -> Self {
        let title = vehicle.title();

        let soc = Reading::from_result(title, "soc", vehicle.soc().await);

        let status = match vehicle.as_charge_state() {
            Some(state) => Reading::from_result(title, "status", state.status().await),
            None => Reading::NotAvailable,
        };

        let range = match vehicle.as_range() {
            Some(range) => Reading::from_result(title, "range", range.range().await),
            None => Reading::NotAvailable,
        };

        let finish_time = match vehicle.as_finish_timer() {
            Some(timer) => Reading::from_result(title, "finish time", timer.finish_time().await),
            None => Reading::NotAvailable,
        };

        Self {
            title: title.to_string(),
            capacity: vehicle.capacity(),
            soc,
            status,
            range,
            finish_time,
        }
    }

    /// Report for a vehicle that could not be built
    pub fn failed(title: &str, capacity: i64, err: &Error) -> Self {
        log::warn!("{}: {}", title, err);
        let error = err.to_string();

        Self {
            title: title.to_string(),
            capacity,
            soc: Reading::Failed {
                error: error.clone(),
            },
            status: Reading::Failed {
                error: error.clone(),
            },
            range: Reading::Failed {
                error: error.clone(),
            },
            finish_time: Reading::Failed { error },
        }
    }
}

/// Vehicle status row for table output
#[derive(Debug, Clone, Tabled)]
pub struct VehicleStatusDisplay {
    #[tabled(rename = "VEHICLE")]
    pub title: String,

    #[tabled(rename = "SOC")]
    pub soc: String,

    #[tabled(rename = "STATUS")]
    pub status: String,

    #[tabled(rename = "RANGE")]
    pub range: String,

    #[tabled(rename = "FINISH")]
    pub finish_time: String,
}

impl From<&VehicleReport> for VehicleStatusDisplay {
    fn from(report: &VehicleReport) -> Self {
        Self {
            title: report.title.clone(),
            soc: report.soc.cell(|soc| format!("{:.0}%", soc)),
            status: report.status.cell(|status| match status {
                ChargeStatus::Unknown => status.to_string(),
                _ => format!("{} ({})", status, status.letter()),
            }),
            range: report.range.cell(|km| format!("{} km", km)),
            finish_time: report.finish_time.cell(format_local_time),
        }
    }
}

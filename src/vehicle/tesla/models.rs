//! Tesla owner API response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `GET /vehicles`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehiclesResponse {
    #[serde(default)]
    pub response: Vec<VehicleSummary>,
}

/// Vehicle as listed on the account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleSummary {
    /// Owner API id used in vehicle URLs (not the VIN)
    pub id: u64,

    #[serde(default)]
    pub vin: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// `GET /vehicles/{id}/vehicle_data`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleDataResponse {
    #[serde(default)]
    pub response: VehicleData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_state: Option<ChargeStateData>,
}

/// Charging section of the vehicle data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChargeStateData {
    /// Percent
    #[serde(default)]
    pub battery_level: Option<f64>,

    /// `Disconnected`, `Stopped`, `Starting`, `Charging`, `Complete`, `NoPower`
    #[serde(default)]
    pub charging_state: Option<String>,

    /// Miles
    #[serde(default)]
    pub battery_range: Option<f64>,

    #[serde(default)]
    pub minutes_to_full_charge: Option<i64>,
}

/// Vehicle data as cached, stamped with the time it was received
///
/// `minutes_to_full_charge` is relative to `fetched_at`, not to the time
/// the cache is read.
#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    pub data: VehicleData,
    pub fetched_at: DateTime<Utc>,
}

impl VehicleData {
    pub fn charge(&self) -> Option<&ChargeStateData> {
        self.charge_state.as_ref()
    }
}

//! Volvo On Call response models

use serde::{Deserialize, Serialize};

/// `GET /customeraccounts`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Absolute URLs of the account's vehicle relations
    #[serde(default)]
    pub account_vehicle_relations: Vec<String>,
}

/// One account/vehicle relation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRelation {
    /// VIN of the related vehicle
    #[serde(default)]
    pub vehicle_id: String,
}

/// `GET /vehicles/{vin}/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hv_battery: Option<HvBattery>,
}

/// High-voltage battery section of the status payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HvBattery {
    /// State of charge in percent
    #[serde(rename = "hvBatteryLevel", default)]
    pub level: Option<f64>,

    /// `CableNotPluggedInCar`, `CablePluggedInCar`, `Charging`, ...
    #[serde(rename = "hvBatteryChargeStatusDerived", default)]
    pub charge_status: Option<String>,

    /// Remaining range in km
    #[serde(rename = "distanceToHVBatteryEmpty", default)]
    pub distance_to_empty: Option<i64>,

    /// e.g. `2021-03-01T10:15:00+0100`
    #[serde(rename = "timeToHVBatteryFullyChargedTimestamp", default)]
    pub fully_charged_at: Option<String>,
}

impl Status {
    pub fn battery(&self) -> Option<&HvBattery> {
        self.hv_battery.as_ref()
    }
}

//! Uniform vehicle abstraction over vendor telemetry APIs
//!
//! Every integration implements [`Vehicle`]; optional capabilities are
//! exposed through the `as_*` accessors so a charge controller can probe
//! what a given vendor payload supports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

pub mod registry;
pub mod status;
pub mod tesla;
pub mod volvo;

pub use registry::VehicleRegistry;
pub use status::StatusAccessor;
pub use tesla::Tesla;
pub use volvo::Volvo;

/// Vehicle charge state, IEC 61851 style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChargeStatus {
    /// A: no cable connected
    Disconnected,
    /// B: connected, not charging
    Connected,
    /// C: charging
    Charging,
    Unknown,
}

impl ChargeStatus {
    /// IEC 61851 status letter, empty when unknown
    pub fn letter(&self) -> &'static str {
        match self {
            ChargeStatus::Disconnected => "A",
            ChargeStatus::Connected => "B",
            ChargeStatus::Charging => "C",
            ChargeStatus::Unknown => "",
        }
    }
}

impl std::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChargeStatus::Disconnected => "disconnected",
            ChargeStatus::Connected => "connected",
            ChargeStatus::Charging => "charging",
            ChargeStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Base vehicle capability
#[async_trait]
pub trait Vehicle: Send + Sync {
    /// Display title
    fn title(&self) -> &str;

    /// Battery capacity in kWh
    fn capacity(&self) -> i64;

    /// State of charge in percent
    async fn soc(&self) -> Result<f64>;

    fn as_charge_state(&self) -> Option<&dyn ChargeState> {
        None
    }

    fn as_range(&self) -> Option<&dyn VehicleRange> {
        None
    }

    fn as_finish_timer(&self) -> Option<&dyn VehicleFinishTimer> {
        None
    }
}

/// Vehicle reports its own charge status
#[async_trait]
pub trait ChargeState: Send + Sync {
    async fn status(&self) -> Result<ChargeStatus>;
}

/// Vehicle reports its remaining range
#[async_trait]
pub trait VehicleRange: Send + Sync {
    /// Remaining range in km; vendors reporting miles convert before returning
    async fn range(&self) -> Result<i64>;
}

/// Vehicle estimates when charging completes
#[async_trait]
pub trait VehicleFinishTimer: Send + Sync {
    /// Absolute finish time; `ApiError::NotAvailable` once it has passed
    async fn finish_time(&self) -> Result<DateTime<Utc>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_status_letters() {
        assert_eq!(ChargeStatus::Disconnected.letter(), "A");
        assert_eq!(ChargeStatus::Connected.letter(), "B");
        assert_eq!(ChargeStatus::Charging.letter(), "C");
        assert_eq!(ChargeStatus::Unknown.letter(), "");
    }

    #[test]
    fn test_charge_status_display() {
        assert_eq!(ChargeStatus::Charging.to_string(), "charging");
        assert_eq!(ChargeStatus::Unknown.to_string(), "unknown");
    }
}

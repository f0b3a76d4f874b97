//! Volvo On Call vehicle integration

pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use self::models::{AccountResponse, Status, VehicleRelation};
use super::status::{finish_time, parse_timestamp};
use super::{ChargeState, ChargeStatus, StatusAccessor, Vehicle, VehicleFinishTimer, VehicleRange};
use crate::cache::CachedValue;
use crate::client::{Credentials, HttpHelper, RequestSigner};
use crate::config::VehicleConfig;
use crate::error::{ApiError, ConfigError, Result};

/// Production API base URL
pub const BASE_URI: &str = "https://vocapi.wirelesscar.net/customerapi/rest/v3.0";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

const STATUS_TABLE: &[(&str, ChargeStatus)] = &[
    ("CableNotPluggedInCar", ChargeStatus::Disconnected),
    ("CablePluggedInCar", ChargeStatus::Connected),
    ("Charging", ChargeStatus::Charging),
];

/// Raw endpoint access, shared with the status cache's fetch closure
struct VolvoApi {
    base: String,
    signer: RequestSigner,
    http: HttpHelper,
}

impl VolvoApi {
    async fn get<T>(&self, uri: &str) -> std::result::Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = self.signer.get(uri).await?;
        self.http.do_json(request).await
    }

    /// VINs of all vehicles on the account
    async fn vehicles(&self) -> std::result::Result<Vec<String>, ApiError> {
        let account: AccountResponse = self.get(&format!("{}/customeraccounts", self.base)).await?;

        let mut vins = Vec::with_capacity(account.account_vehicle_relations.len());
        for relation in &account.account_vehicle_relations {
            let vehicle: VehicleRelation = self.get(relation).await?;
            vins.push(vehicle.vehicle_id);
        }

        Ok(vins)
    }

    async fn status(&self, vin: &str) -> std::result::Result<Status, ApiError> {
        self.get(&format!("{}/vehicles/{}/status", self.base, vin)).await
    }
}

/// Volvo vehicle backed by the On Call customer API
pub struct Volvo {
    title: String,
    capacity: i64,
    vin: String,
    status: StatusAccessor<Status>,
}

impl Volvo {
    /// Build from config, discovering the VIN from the account if not set
    pub async fn new(config: &VehicleConfig) -> Result<Self> {
        let (user, password) = config.credentials()?;

        let signer = RequestSigner::new(Credentials::Basic {
            user: user.to_string(),
            password: password.to_string(),
        })
        .with_header("x-device-id", "Device")
        .with_header("x-os-type", "Android")
        .with_header("x-originator-type", "App")
        .with_header("x-os-version", "22");

        let api = Arc::new(VolvoApi {
            base: config
                .api_host
                .clone()
                .unwrap_or_else(|| BASE_URI.to_string()),
            signer,
            http: HttpHelper::new()?,
        });

        let vin = match config.vin() {
            Some(vin) => vin.to_string(),
            None => {
                let vin = api.vehicles().await?.into_iter().next().ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "{}: no vehicles found on account",
                        config.display_title()
                    ))
                })?;
                log::debug!("volvo: found vehicle {}", vin);
                vin
            }
        };

        let fetch_vin = vin.clone();
        let cache = CachedValue::new(
            move || {
                let api = Arc::clone(&api);
                let vin = fetch_vin.clone();
                async move { api.status(&vin).await }
            },
            config.cache,
        );

        Ok(Self {
            title: config.display_title().to_string(),
            capacity: config.capacity,
            vin,
            status: StatusAccessor::new(cache),
        })
    }

    pub fn vin(&self) -> &str {
        &self.vin
    }
}

#[async_trait]
impl Vehicle for Volvo {
    fn title(&self) -> &str {
        &self.title
    }

    fn capacity(&self) -> i64 {
        self.capacity
    }

    async fn soc(&self) -> Result<f64> {
        Ok(self.status.read(|s| s.battery().and_then(|b| b.level)).await?)
    }

    fn as_charge_state(&self) -> Option<&dyn ChargeState> {
        Some(self)
    }

    fn as_range(&self) -> Option<&dyn VehicleRange> {
        Some(self)
    }

    fn as_finish_timer(&self) -> Option<&dyn VehicleFinishTimer> {
        Some(self)
    }
}

#[async_trait]
impl ChargeState for Volvo {
    async fn status(&self) -> Result<ChargeStatus> {
        let status = self
            .status
            .charge_status(STATUS_TABLE, |s| {
                s.battery().and_then(|b| b.charge_status.clone())
            })
            .await?;
        Ok(status)
    }
}

#[async_trait]
impl VehicleRange for Volvo {
    async fn range(&self) -> Result<i64> {
        Ok(self
            .status
            .read(|s| s.battery().and_then(|b| b.distance_to_empty))
            .await?)
    }
}

#[async_trait]
impl VehicleFinishTimer for Volvo {
    // Remaining range is added as minutes; the vendor semantics are unverified.
    async fn finish_time(&self) -> Result<DateTime<Utc>> {
        let battery = self.status.read(|s| s.battery().cloned()).await?;

        let timestamp = parse_timestamp(
            battery.fully_charged_at.as_deref().unwrap_or_default(),
            TIMESTAMP_FORMAT,
        )?;
        let offset = chrono::Duration::minutes(battery.distance_to_empty.unwrap_or_default());

        Ok(finish_time(timestamp, offset, Utc::now())?)
    }
}

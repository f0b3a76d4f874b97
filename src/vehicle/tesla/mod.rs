//! Tesla owner API vehicle integration

pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use self::models::{VehicleDataResponse, VehicleSnapshot, VehicleSummary, VehiclesResponse};
use super::status::finish_time;
use super::{ChargeState, ChargeStatus, StatusAccessor, Vehicle, VehicleFinishTimer, VehicleRange};
use crate::auth::{Identity, OAuthConfig, TokenSet};
use crate::cache::CachedValue;
use crate::client::{Credentials, HttpHelper, RequestSigner};
use crate::config::VehicleConfig;
use crate::error::{ApiError, ConfigError, Result};

/// Production owner API base URL
pub const BASE_URI: &str = "https://owner-api.teslamotors.com/api/1";

const KM_PER_MILE: f64 = 1.609344;

const STATUS_TABLE: &[(&str, ChargeStatus)] = &[
    ("Disconnected", ChargeStatus::Disconnected),
    ("Stopped", ChargeStatus::Connected),
    ("Complete", ChargeStatus::Connected),
    ("NoPower", ChargeStatus::Connected),
    ("Starting", ChargeStatus::Charging),
    ("Charging", ChargeStatus::Charging),
];

struct TeslaApi {
    base: String,
    signer: RequestSigner,
    http: HttpHelper,
}

impl TeslaApi {
    async fn vehicles(&self) -> std::result::Result<Vec<VehicleSummary>, ApiError> {
        let request = self.signer.get(&format!("{}/vehicles", self.base)).await?;
        let vehicles: VehiclesResponse = self.http.do_json(request).await?;
        Ok(vehicles.response)
    }

    async fn vehicle_data(&self, id: u64) -> std::result::Result<VehicleSnapshot, ApiError> {
        let uri = format!("{}/vehicles/{}/vehicle_data", self.base, id);
        let request = self.signer.get(&uri).await?;
        let data: VehicleDataResponse = self.http.do_json(request).await?;
        Ok(VehicleSnapshot {
            data: data.response,
            fetched_at: Utc::now(),
        })
    }
}

/// Tesla vehicle authenticated with previously issued OAuth tokens
pub struct Tesla {
    title: String,
    capacity: i64,
    vehicle: VehicleSummary,
    status: StatusAccessor<VehicleSnapshot>,
}

impl Tesla {
    /// Build from config; tokens come from `evpoll login`
    pub async fn new(config: &VehicleConfig) -> Result<Self> {
        let tokens = config.tokens.as_ref().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "{}: missing tokens, run `evpoll login` first",
                config.display_title()
            ))
        })?;

        let token_source = Identity::new(OAuthConfig::tesla())?
            .with_tokens(TokenSet::from(tokens))
            .token_source();
        let signer = RequestSigner::new(Credentials::Bearer(Arc::new(token_source)));

        let api = Arc::new(TeslaApi {
            base: config
                .api_host
                .clone()
                .unwrap_or_else(|| BASE_URI.to_string()),
            signer,
            http: HttpHelper::new()?,
        });

        let vehicles = api.vehicles().await?;
        let vehicle = match config.vin() {
            Some(vin) => vehicles.into_iter().find(|v| v.vin == vin),
            None => vehicles.into_iter().next(),
        }
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "{}: vehicle not found on account",
                config.display_title()
            ))
        })?;
        log::debug!("tesla: using vehicle {} ({})", vehicle.vin, vehicle.id);

        let id = vehicle.id;
        let cache = CachedValue::new(
            move || {
                let api = Arc::clone(&api);
                async move { api.vehicle_data(id).await }
            },
            config.cache,
        );

        Ok(Self {
            title: config.display_title().to_string(),
            capacity: config.capacity,
            vehicle,
            status: StatusAccessor::new(cache),
        })
    }

    pub fn vin(&self) -> &str {
        &self.vehicle.vin
    }
}

#[async_trait]
impl Vehicle for Tesla {
    fn title(&self) -> &str {
        &self.title
    }

    fn capacity(&self) -> i64 {
        self.capacity
    }

    async fn soc(&self) -> Result<f64> {
        Ok(self
            .status
            .read(|d| d.data.charge().and_then(|c| c.battery_level))
            .await?)
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
impl ChargeState for Tesla {
    async fn status(&self) -> Result<ChargeStatus> {
        let status = self
            .status
            .charge_status(STATUS_TABLE, |d| {
                d.data.charge().and_then(|c| c.charging_state.clone())
            })
            .await?;
        Ok(status)
    }
}

#[async_trait]
impl VehicleRange for Tesla {
    async fn range(&self) -> Result<i64> {
        let miles: f64 = self
            .status
            .read(|d| d.data.charge().and_then(|c| c.battery_range))
            .await?;
        Ok((miles * KM_PER_MILE) as i64)
    }
}

#[async_trait]
impl VehicleFinishTimer for Tesla {
    async fn finish_time(&self) -> Result<DateTime<Utc>> {
        let snapshot = self.status.get().await?;
        let minutes = snapshot
            .data
            .charge()
            .and_then(|c| c.minutes_to_full_charge)
            .unwrap_or_default();

        Ok(charge_finish(snapshot.fetched_at, minutes, Utc::now())?)
    }
}

/// Finish time from minutes remaining as of `fetched_at`
fn charge_finish(
    fetched_at: DateTime<Utc>,
    minutes: i64,
    now: DateTime<Utc>,
) -> std::result::Result<DateTime<Utc>, ApiError> {
    if minutes <= 0 {
        return Err(ApiError::NotAvailable);
    }
    finish_time(fetched_at, chrono::Duration::minutes(minutes), now)
}

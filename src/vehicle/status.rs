//! Typed reads through a vehicle's shared status cache
//!
//! Vendor payloads are often incomplete (vehicle asleep, feature not
//! entitled). Every accessor degrades the same way: a fetch error is passed
//! through, an absent field becomes the zero value.

use chrono::{DateTime, Utc};

use super::ChargeStatus;
use crate::cache::CachedValue;
use crate::error::ApiError;

/// Shared status cache of one vehicle integration
pub struct StatusAccessor<T> {
    cache: CachedValue<T>,
}

impl<T> StatusAccessor<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(cache: CachedValue<T>) -> Self {
        Self { cache }
    }

    /// Full cached payload
    pub async fn get(&self) -> Result<T, ApiError> {
        self.cache.get().await
    }

    /// Extract one field, falling back to its zero value when absent.
    pub async fn read<R, F>(&self, extract: F) -> Result<R, ApiError>
    where
        R: Default,
        F: FnOnce(&T) -> Option<R>,
    {
        let payload = self.cache.get().await?;
        Ok(extract(&payload).unwrap_or_default())
    }

    /// Extract a vendor status string and translate it with `table`.
    pub async fn charge_status<F>(
        &self,
        table: &[(&str, ChargeStatus)],
        extract: F,
    ) -> Result<ChargeStatus, ApiError>
    where
        F: FnOnce(&T) -> Option<String>,
    {
        let value: String = self.read(extract).await?;
        Ok(lookup_status(table, &value))
    }
}

/// Exact-match translation; anything not listed is `Unknown`.
pub fn lookup_status(table: &[(&str, ChargeStatus)], value: &str) -> ChargeStatus {
    table
        .iter()
        .find(|(vendor, _)| *vendor == value)
        .map(|(_, status)| *status)
        .unwrap_or(ChargeStatus::Unknown)
}

/// Parse a vendor timestamp with an explicit offset (`format` as in `chrono`)
pub fn parse_timestamp(value: &str, format: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_str(value, format)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ApiError::InvalidResponse(format!("invalid timestamp {:?}: {}", value, e)))
}

/// `base + offset`, or `NotAvailable` if that is already in the past.
pub fn finish_time(
    base: DateTime<Utc>,
    offset: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ApiError> {
    let finish = base + offset;
    if finish < now {
        return Err(ApiError::NotAvailable);
    }
    Ok(finish)
}

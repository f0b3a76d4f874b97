//! In-memory caching of vendor responses
//!
//! Vendor polling endpoints are slow, rate limited and sometimes billed per
//! call. Every vehicle integration reads its status through one
//! [`CachedValue`], which bounds data age by a TTL and collapses concurrent
//! reads into a single upstream request.

pub mod value;

use std::time::Duration;

/// Cache TTL configuration
pub struct CacheTtl;

impl CacheTtl {
    /// Default status polling interval when a vehicle config sets none
    pub const DEFAULT: Duration = Duration::from_secs(15 * 60); // 15 min
}

pub use value::CachedValue;

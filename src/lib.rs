//! evpoll - cached vehicle telemetry for EV charge controllers
//!
//! Vendor integrations ([`vehicle::Volvo`], [`vehicle::Tesla`]) read battery
//! state through a TTL-bounded, single-flight cache and expose it as the
//! uniform [`vehicle::Vehicle`] capability set.

pub mod auth;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod vehicle;

pub use error::{Error, Result};

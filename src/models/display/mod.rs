//! Display model implementations for table and JSON output
//!
//! Display models turn vehicle readings into CLI-friendly rows with
//! appropriate column names and serialization.

mod common;
mod vehicle;

pub use vehicle::{Reading, VehicleReport, VehicleStatusDisplay};

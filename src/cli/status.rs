//! Status command implementation

use futures::future::join_all;

use crate::cli::args::GlobalOptions;
use crate::config::{Config, VehicleConfig};
use crate::error::{ConfigError, Result};
use crate::models::VehicleReport;
use crate::output;
use crate::vehicle::VehicleRegistry;

/// Read every configured vehicle (or the one titled `only`) and print a report
pub async fn run(opts: &GlobalOptions, only: Option<&str>) -> Result<()> {
    let config = Config::load_at(opts.config_ref())?;
    let selected = select_vehicles(&config, only)?;

    let registry = VehicleRegistry::with_defaults();
    let reports = join_all(selected.into_iter().map(|vc| report(&registry, vc))).await;

    println!("{}", output::format_reports(&reports, opts.format)?);
    Ok(())
}

fn select_vehicles<'a>(config: &'a Config, only: Option<&str>) -> Result<Vec<&'a VehicleConfig>> {
    let Some(title) = only else {
        return Ok(config.vehicles.iter().collect());
    };

    let selected: Vec<_> = config
        .vehicles
        .iter()
        .filter(|vc| vc.display_title().eq_ignore_ascii_case(title))
        .collect();

    if selected.is_empty() {
        return Err(ConfigError::Invalid(format!("no vehicle titled {:?}", title)).into());
    }
    Ok(selected)
}

async fn report(registry: &VehicleRegistry, config: &VehicleConfig) -> VehicleReport {
    match registry.create(config).await {
        Ok(vehicle) => VehicleReport::collect(vehicle.as_ref()).await,
        Err(err) => VehicleReport::failed(config.display_title(), config.capacity, &err),
    }
}

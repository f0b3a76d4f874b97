//! Vehicle factories keyed by config `type`

use std::collections::BTreeMap;

use futures::future::BoxFuture;

use super::{Tesla, Vehicle, Volvo};
use crate::config::VehicleConfig;
use crate::error::{ConfigError, Result};

/// Async constructor for one integration type
pub type VehicleFactory = for<'a> fn(&'a VehicleConfig) -> BoxFuture<'a, Result<Box<dyn Vehicle>>>;

/// Maps integration type names to factories
#[derive(Clone, Default)]
pub struct VehicleRegistry {
    factories: BTreeMap<String, VehicleFactory>,
}

impl VehicleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in integration
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("volvo", volvo);
        registry.register("tesla", tesla);
        registry
    }

    /// Register `factory` under `kind`, replacing any previous entry
    pub fn register(&mut self, kind: &str, factory: VehicleFactory) {
        self.factories.insert(kind.to_lowercase(), factory);
    }

    /// Registered type names, sorted
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build the vehicle described by `config`
    pub async fn create(&self, config: &VehicleConfig) -> Result<Box<dyn Vehicle>> {
        let factory = self
            .factories
            .get(&config.kind.to_lowercase())
            .ok_or_else(|| ConfigError::UnknownVehicle(config.kind.clone()))?;
        config.validate()?;

        factory(config).await
    }
}

fn volvo(config: &VehicleConfig) -> BoxFuture<'_, Result<Box<dyn Vehicle>>> {
    Box::pin(async move { Ok(Box::new(Volvo::new(config).await?) as Box<dyn Vehicle>) })
}

fn tesla(config: &VehicleConfig) -> BoxFuture<'_, Result<Box<dyn Vehicle>>> {
    Box::pin(async move { Ok(Box::new(Tesla::new(config).await?) as Box<dyn Vehicle>) })
}

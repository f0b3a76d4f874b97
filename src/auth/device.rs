//! Second-factor device selection hooks

use async_trait::async_trait;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// MFA device registered with the vendor account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Factor ID used when verifying the passcode
    pub id: String,

    /// Display name chosen by the account owner
    pub name: String,

    #[serde(default)]
    pub factor_type: Option<String>,

    #[serde(default)]
    pub factor_provider: Option<String>,
}

/// Picks the device and passcode when the vendor demands a second factor.
///
/// Installed per authenticator so interactive, headless and test strategies
/// can be swapped without touching the login flow.
#[async_trait]
pub trait DeviceHandler: Send + Sync {
    /// Select one of `devices` and return it with its current passcode
    async fn select_device(&self, devices: &[Device]) -> Result<(Device, String), AuthError>;
}

/// Default handler: refuses every second-factor request.
#[derive(Debug, Default, Clone, Copy)]
pub struct MfaUnsupported;

#[async_trait]
impl DeviceHandler for MfaUnsupported {
    async fn select_device(&self, _devices: &[Device]) -> Result<(Device, String), AuthError> {
        Err(AuthError::MfaUnsupported)
    }
}

/// Headless handler with a pre-provisioned passcode.
///
/// Chooses the device named `device` if set, otherwise the first one offered.
#[derive(Debug, Clone)]
pub struct PasscodeDevice {
    passcode: String,
    device: Option<String>,
}

impl PasscodeDevice {
    pub fn new(passcode: impl Into<String>) -> Self {
        Self {
            passcode: passcode.into(),
            device: None,
        }
    }

    /// Prefer the device with this display name
    #[must_use]
    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.device = Some(name.into());
        self
    }
}

#[async_trait]
impl DeviceHandler for PasscodeDevice {
    async fn select_device(&self, devices: &[Device]) -> Result<(Device, String), AuthError> {
        let device = match &self.device {
            Some(name) => devices.iter().find(|d| &d.name == name),
            None => devices.first(),
        };

        device
            .cloned()
            .map(|d| (d, self.passcode.clone()))
            .ok_or_else(|| AuthError::Prompt("no matching MFA device".to_string()))
    }
}

/// Interactive handler prompting on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptDevice;

#[async_trait]
impl DeviceHandler for PromptDevice {
    async fn select_device(&self, devices: &[Device]) -> Result<(Device, String), AuthError> {
        let prompt_err = |e: dialoguer::Error| AuthError::Prompt(e.to_string());

        let device = match devices {
            [] => return Err(AuthError::Prompt("no MFA devices registered".to_string())),
            [only] => only.clone(),
            _ => {
                let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
                let idx = Select::with_theme(&ColorfulTheme::default())
                    .with_prompt("Select MFA device")
                    .items(&names)
                    .default(0)
                    .interact()
                    .map_err(prompt_err)?;
                devices[idx].clone()
            }
        };

        let passcode: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Passcode for {}", device.name))
            .interact_text()
            .map_err(prompt_err)?;

        Ok((device, passcode.trim().to_string()))
    }
}

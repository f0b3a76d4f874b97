//! Configuration management for evpoll

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::TokenSet;
use crate::cache::CacheTtl;
use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Configured vehicles
    #[serde(default)]
    pub vehicles: Vec<VehicleConfig>,
}

/// One vehicle integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Integration type (`volvo`, `tesla`)
    #[serde(rename = "type")]
    pub kind: String,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Battery capacity in kWh
    #[serde(default)]
    pub capacity: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Vehicle identification number; discovered from the account if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,

    /// Previously issued OAuth tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenConfig>,

    /// Override the vendor API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,

    /// Status cache TTL: seconds, or a string like `30s`, `15m`, `1h`
    #[serde(default = "default_cache", with = "cache_duration")]
    pub cache: Duration,
}

fn default_cache() -> Duration {
    CacheTtl::DEFAULT
}

/// OAuth token pair as stored in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub access: String,
    pub refresh: String,

    /// Access token expiry; unknown means refresh on first use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl From<&TokenConfig> for TokenSet {
    fn from(tokens: &TokenConfig) -> Self {
        TokenSet {
            access_token: tokens.access.clone(),
            refresh_token: tokens.refresh.clone(),
            expiry: tokens.expiry.unwrap_or_else(Utc::now),
        }
    }
}

impl From<&TokenSet> for TokenConfig {
    fn from(tokens: &TokenSet) -> Self {
        TokenConfig {
            access: tokens.access_token.clone(),
            refresh: tokens.refresh_token.clone(),
            expiry: Some(tokens.expiry),
        }
    }
}

impl VehicleConfig {
    /// Create a config of the given type with defaults
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: String::new(),
            capacity: 0,
            user: None,
            password: None,
            vin: None,
            tokens: None,
            api_host: None,
            cache: CacheTtl::DEFAULT,
        }
    }

    /// Title, falling back to the integration type
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.kind
        } else {
            &self.title
        }
    }

    /// Required user/password pair
    pub fn credentials(&self) -> Result<(&str, &str)> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() => Ok((user, password)),
            _ => Err(ConfigError::Invalid(format!(
                "{}: user and password are required",
                self.display_title()
            ))
            .into()),
        }
    }

    /// Configured VIN, if any
    pub fn vin(&self) -> Option<&str> {
        self.vin.as_deref().filter(|v| !v.is_empty())
    }

    /// Check the settings the integration type requires
    pub fn validate(&self) -> Result<()> {
        match self.kind.to_lowercase().as_str() {
            "volvo" => self.credentials().map(|_| ()),
            "tesla" if self.tokens.is_none() => Err(ConfigError::Invalid(format!(
                "{}: tokens are required, run `evpoll login` first",
                self.display_title()
            ))
            .into()),
            _ => Ok(()),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".evpoll").join("config.yaml"))
    }

    /// Resolve an optional override to the config file path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from `path`, or the default location
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        Self::load_from(Self::resolve_path(path)?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        Self::parse(&contents)
    }

    /// Parse YAML configuration text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents).map_err(ConfigError::from)?;
        Ok(config)
    }
}

/// Parse `90`, `90s`, `15m` or `1h`
pub fn parse_duration(value: &str) -> std::result::Result<Duration, ConfigError> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let number: u64 = number
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("invalid duration: {:?}", value)))?;

    let scale: u64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(ConfigError::Invalid(format!(
                "invalid duration unit: {:?}",
                value
            )));
        }
    };

    let seconds = number
        .checked_mul(scale)
        .ok_or_else(|| ConfigError::Invalid(format!("duration out of range: {:?}", value)))?;

    Ok(Duration::from_secs(seconds))
}

mod cache_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Repr::Text(text) => super::parse_duration(&text).map_err(de::Error::custom),
        }
    }
}

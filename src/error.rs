//! Error types for evpoll

use std::time::Duration;
use thiserror::Error;

use crate::auth::AuthPhase;

/// Result type alias for evpoll operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

impl Error {
    /// True when the data is known but currently meaningless (e.g. a finish
    /// time that already elapsed). Callers should suppress rather than alarm.
    pub fn is_not_available(&self) -> bool {
        matches!(self, Error::Api(ApiError::NotAvailable))
    }
}

/// Vendor API errors.
///
/// Cloneable so a single fetch outcome can be cached and handed to every
/// waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Authentication failed. Check the configured vehicle credentials.")]
    Unauthorized,

    #[error("Access denied. The account has no permission for this resource.")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Value not available")]
    NotAvailable,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Interactive login errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("multi factor authentication is not supported")]
    MfaUnsupported,

    #[error("multi factor passcode was rejected")]
    MfaRejected,

    #[error("login step not allowed in phase {actual:?} (expected {expected:?})")]
    InvalidState {
        expected: AuthPhase,
        actual: AuthPhase,
    },

    #[error("authorization state mismatch")]
    StateMismatch,

    #[error("authorization response did not contain a code")]
    MissingCode,

    #[error("login failed: {0}")]
    LoginFailed(String),

    /// RFC 6749 error response from the token endpoint
    #[error("token request rejected: {error}{}", parenthesized(.description))]
    TokenRejected {
        error: String,
        description: Option<String>,
    },

    #[error("device selection failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

fn parenthesized(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Api(err.into())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Create ~/.evpoll/config.yaml or pass --config.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown vehicle type: {0}")]
    UnknownVehicle(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

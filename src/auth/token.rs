//! OAuth token set

use chrono::{DateTime, Utc};
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// Access/refresh token pair with expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
}

impl TokenSet {
    /// Check if the access token is expired or will expire within 5 minutes
    pub fn is_expired(&self) -> bool {
        let buffer = chrono::Duration::minutes(EXPIRY_BUFFER_MINUTES);
        self.expiry - buffer < Utc::now()
    }

    /// Convert a token endpoint response. A refresh response without a new
    /// refresh token keeps `previous_refresh`; a missing `expires_in` means
    /// the access token is treated as already expired.
    pub(crate) fn from_response(
        response: &BasicTokenResponse,
        previous_refresh: Option<&str>,
    ) -> Self {
        let expires_in = response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or_else(chrono::Duration::zero);

        TokenSet {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| previous_refresh.map(str::to_string))
                .unwrap_or_default(),
            expiry: Utc::now() + expires_in,
        }
    }
}

//! Outbound request construction with vendor headers and credentials

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Request, Url};

use crate::error::ApiError;

/// Source of the current bearer token.
///
/// Implementations own refreshing; the signer only reads.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, ApiError>;
}

/// How requests are authenticated
#[derive(Clone)]
pub enum Credentials {
    /// HTTP Basic auth, encoded per request
    Basic { user: String, password: String },
    /// Bearer token read from the authenticator
    Bearer(Arc<dyn TokenSource>),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .finish_non_exhaustive(),
            Credentials::Bearer(_) => f.write_str("Bearer"),
        }
    }
}

/// Builds requests carrying static vendor headers plus a credential header
#[derive(Debug, Clone)]
pub struct RequestSigner {
    headers: HeaderMap,
    credentials: Credentials,
}

impl RequestSigner {
    /// Create a signer sending `Content-Type: application/json` and `credentials`
    pub fn new(credentials: Credentials) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            headers,
            credentials,
        }
    }

    /// Add a static vendor header (device identity, platform, protocol version)
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    /// Build a GET request for `uri`
    pub async fn get(&self, uri: &str) -> Result<Request, ApiError> {
        self.request(Method::GET, uri).await
    }

    /// Build a request for `uri` with all headers applied
    pub async fn request(&self, method: Method, uri: &str) -> Result<Request, ApiError> {
        let url = Url::parse(uri)
            .map_err(|e| ApiError::BadRequest(format!("Invalid URI {}: {}", uri, e)))?;

        let mut request = Request::new(method, url);
        let headers = request.headers_mut();
        headers.extend(self.headers.clone());

        let mut credential = HeaderValue::from_str(&self.authorization().await?)
            .map_err(|e| ApiError::BadRequest(format!("Invalid credential header: {}", e)))?;
        credential.set_sensitive(true);
        headers.insert(AUTHORIZATION, credential);

        Ok(request)
    }

    async fn authorization(&self) -> Result<String, ApiError> {
        match &self.credentials {
            Credentials::Basic { user, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", user, password));
                Ok(format!("Basic {}", encoded))
            }
            Credentials::Bearer(source) => {
                let token = source.access_token().await?;
                Ok(format!("Bearer {}", token))
            }
        }
    }
}

//! HTTP execution with status-to-error mapping

use std::time::Duration;

use reqwest::{Client as HttpClient, Request, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Bounded request timeout; a hung vendor call must not block cache waiters forever
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes signed requests and decodes JSON responses
#[derive(Debug, Clone)]
pub struct HttpHelper {
    http: HttpClient,
}

impl HttpHelper {
    /// Create a helper with the default request timeout
    pub fn new() -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self { http })
    }

    /// Execute `request` and decode the JSON body into `T`
    pub async fn do_json<T: DeserializeOwned>(&self, request: Request) -> Result<T, ApiError> {
        log::debug!("{} {}", request.method(), request.url());

        let response = self.http.execute(request).await?;
        let response = ensure_success(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

/// Map a non-success status to the matching `ApiError`
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
        StatusCode::NOT_FOUND => {
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| "Resource not found".to_string());
            Err(ApiError::NotFound(error_msg))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            Err(ApiError::RateLimit(Duration::from_secs(retry_after)))
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| "Bad request".to_string());
            Err(ApiError::BadRequest(error_msg))
        }
        status if status.is_server_error() => {
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| format!("Server error: {}", status));
            Err(ApiError::ServerError(error_msg))
        }
        _ => Err(ApiError::InvalidResponse(format!(
            "Unexpected status code: {}",
            status
        ))),
    }
}

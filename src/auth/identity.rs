//! Authorization Code + PKCE login against a vendor identity provider
//!
//! The flow follows the Tesla SSO login: the authorization page is fetched
//! for its hidden form fields, the credentials are posted back, and either a
//! redirect carrying the code arrives or the second-factor dance starts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use oauth2::basic::BasicErrorResponse;
use oauth2::{AuthorizationCode, RefreshToken, RequestTokenError};
use reqwest::{Client as HttpClient, Response, Url, redirect};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::device::{Device, DeviceHandler, MfaUnsupported};
use super::session::{AuthPhase, AuthSession, AuthState, OAuthConfig};
use super::token::TokenSet;
use crate::client::TokenSource;
use crate::client::request::{REQUEST_TIMEOUT, ensure_success};
use crate::error::{ApiError, AuthError};

const TESLA_CLIENT_ID: &str = "ownerapi";
const TESLA_AUTH_URL: &str = "https://auth.tesla.com/oauth2/v3/authorize";
const TESLA_TOKEN_URL: &str = "https://auth.tesla.com/oauth2/v3/token";
const TESLA_REDIRECT_URI: &str = "https://auth.tesla.com/void/callback";
const TESLA_SCOPES: &str = "openid email offline_access";

impl OAuthConfig {
    /// Tesla owner API identity provider
    pub fn tesla() -> Self {
        Self::new(
            TESLA_CLIENT_ID,
            TESLA_AUTH_URL.parse().expect("valid default URL"),
            TESLA_TOKEN_URL.parse().expect("valid default URL"),
            TESLA_REDIRECT_URI.parse().expect("valid default URL"),
            TESLA_SCOPES.split(' ').map(str::to_string).collect(),
        )
    }
}

/// Interactive authenticator owning the resulting tokens.
///
/// Steps are single-attempt; any failure leaves the authenticator in
/// [`AuthPhase::Failed`] and the caller decides whether to [`Identity::reset`]
/// and start over.
pub struct Identity {
    config: OAuthConfig,
    http: HttpClient,
    device_handler: Box<dyn DeviceHandler>,
    state: AuthState,
    tokens: TokenHandle,
}

impl Identity {
    /// Create an authenticator with the default (rejecting) device handler
    pub fn new(config: OAuthConfig) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(redirect::Policy::none())
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let tokens = TokenHandle::new(config.clone(), http.clone(), None);

        Ok(Self {
            config,
            http,
            device_handler: Box::new(MfaUnsupported),
            state: AuthState::Idle,
            tokens,
        })
    }

    /// Install an alternative second-factor handler
    #[must_use]
    pub fn with_device_handler(mut self, handler: impl DeviceHandler + 'static) -> Self {
        self.set_device_handler(handler);
        self
    }

    pub fn set_device_handler(&mut self, handler: impl DeviceHandler + 'static) {
        self.device_handler = Box::new(handler);
    }

    /// Seed previously issued tokens (e.g. from configuration)
    #[must_use]
    pub fn with_tokens(mut self, tokens: TokenSet) -> Self {
        self.tokens = TokenHandle::new(self.config.clone(), self.http.clone(), Some(tokens));
        self
    }

    /// Read-only handle for request signing; refreshes expired tokens
    pub fn token_source(&self) -> TokenHandle {
        self.tokens.clone()
    }

    pub fn phase(&self) -> AuthPhase {
        self.state.phase()
    }

    /// The active session, if one has been started and not yet consumed
    pub fn session(&self) -> Option<&AuthSession> {
        match &self.state {
            AuthState::SessionStarted(session)
            | AuthState::AwaitingUserCredentials(session)
            | AuthState::AwaitingSecondFactor(session)
            | AuthState::CodeReceived { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Discard any session and return to `Idle`
    pub fn reset(&mut self) {
        self.state = AuthState::Idle;
    }

    /// Generate fresh PKCE material and the authorization URL.
    pub fn start_session(&mut self) -> Result<&AuthSession, AuthError> {
        self.expect_phase(AuthPhase::Idle)?;

        self.state = AuthState::SessionStarted(AuthSession::start(&self.config));
        log::debug!("Login session started");

        self.session().ok_or(AuthError::MissingCode)
    }

    /// Submit credentials, handling a second factor if the vendor asks for one.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        self.expect_phase(AuthPhase::SessionStarted)?;

        let session = match std::mem::replace(&mut self.state, AuthState::Failed) {
            AuthState::SessionStarted(session) => session,
            _ => return Err(AuthError::MissingCode),
        };
        self.state = AuthState::AwaitingUserCredentials(session);

        match self.authorize(username, password).await {
            Ok(code) => {
                let session = match std::mem::replace(&mut self.state, AuthState::Failed) {
                    AuthState::AwaitingUserCredentials(session)
                    | AuthState::AwaitingSecondFactor(session) => session,
                    _ => return Err(AuthError::MissingCode),
                };
                self.state = AuthState::CodeReceived { session, code };
                log::debug!("Authorization code received");
                Ok(())
            }
            Err(err) => {
                log::debug!("Login failed: {}", err);
                self.state = AuthState::Failed;
                Err(err)
            }
        }
    }

    /// Exchange the authorization code for tokens, proving the session's verifier.
    ///
    /// The session is consumed whether or not the exchange succeeds.
    pub async fn exchange_token(&mut self) -> Result<TokenSet, AuthError> {
        self.expect_phase(AuthPhase::CodeReceived)?;

        let (session, code) = match std::mem::replace(&mut self.state, AuthState::Failed) {
            AuthState::CodeReceived { session, code } => (session, code),
            _ => return Err(AuthError::MissingCode),
        };

        let client = self.config.client();
        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(session.into_verifier())
            .request_async(&self.http)
            .await
            .map_err(token_error)?;

        let tokens = TokenSet::from_response(&response, None);
        self.tokens.store(tokens.clone()).await;

        self.state = AuthState::TokenExchanged;
        log::debug!("Token exchange complete");

        Ok(tokens)
    }

    /// Run the whole flow from a fresh session.
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<TokenSet, AuthError> {
        self.reset();
        self.start_session()?;
        self.login(username, password).await?;
        self.exchange_token().await
    }

    fn expect_phase(&self, expected: AuthPhase) -> Result<(), AuthError> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(AuthError::InvalidState { expected, actual })
        }
    }

    async fn authorize(&mut self, username: &str, password: &str) -> Result<String, AuthError> {
        let (auth_url, expected_state) = match self.session() {
            Some(session) => (
                session.authorization_url().clone(),
                session.state().to_string(),
            ),
            None => return Err(AuthError::MissingCode),
        };

        let page = self.http.get(auth_url.clone()).send().await?;
        let page = ensure_success(page).await?;
        let mut form = hidden_inputs(&page.text().await?);
        form.insert("identity".to_string(), username.to_string());
        form.insert("credential".to_string(), password.to_string());

        let response = self.http.post(auth_url.clone()).form(&form).send().await?;
        if let Some(code) = redirect_code(&response, &auth_url, &expected_state)? {
            return Ok(code);
        }

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() || !body.contains("/mfa/verify") {
            return Err(AuthError::LoginFailed(format!(
                "unexpected response status {}",
                status
            )));
        }

        let transaction_id = form
            .get("transaction_id")
            .cloned()
            .or_else(|| hidden_inputs(&body).remove("transaction_id"))
            .ok_or_else(|| AuthError::LoginFailed("missing transaction id".to_string()))?;

        self.await_second_factor();
        self.verify_second_factor(&auth_url, &transaction_id).await?;

        let form = HashMap::from([("transaction_id", transaction_id.as_str())]);
        let response = self.http.post(auth_url.clone()).form(&form).send().await?;

        redirect_code(&response, &auth_url, &expected_state)?.ok_or(AuthError::MissingCode)
    }

    fn await_second_factor(&mut self) {
        if let AuthState::AwaitingUserCredentials(session) =
            std::mem::replace(&mut self.state, AuthState::Failed)
        {
            self.state = AuthState::AwaitingSecondFactor(session);
            log::debug!("Second factor requested");
        }
    }

    async fn verify_second_factor(
        &self,
        auth_url: &Url,
        transaction_id: &str,
    ) -> Result<(), AuthError> {
        #[derive(Deserialize)]
        struct FactorsResponse {
            data: Vec<Device>,
        }

        #[derive(Serialize)]
        struct VerifyRequest<'a> {
            transaction_id: &'a str,
            factor_id: &'a str,
            passcode: &'a str,
        }

        #[derive(Deserialize)]
        struct VerifyResult {
            valid: bool,
        }

        #[derive(Deserialize)]
        struct VerifyResponse {
            data: VerifyResult,
        }

        let mut factors_url = mfa_url(auth_url, "factors")?;
        factors_url
            .query_pairs_mut()
            .append_pair("transaction_id", transaction_id);

        let response = self.http.get(factors_url).send().await?;
        let factors: FactorsResponse = ensure_success(response).await?.json().await?;

        let (device, passcode) = self.device_handler.select_device(&factors.data).await?;
        log::debug!("Verifying passcode for device {}", device.name);

        let request = VerifyRequest {
            transaction_id,
            factor_id: &device.id,
            passcode: &passcode,
        };
        let response = self
            .http
            .post(mfa_url(auth_url, "verify")?)
            .json(&request)
            .send()
            .await?;
        let verify: VerifyResponse = ensure_success(response).await?.json().await?;

        if verify.data.valid {
            Ok(())
        } else {
            Err(AuthError::MfaRejected)
        }
    }
}

/// `{authorize}/mfa/{segment}` without the authorization query
fn mfa_url(auth_url: &Url, segment: &str) -> Result<Url, AuthError> {
    let mut url = auth_url.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| AuthError::LoginFailed(format!("cannot derive MFA URL from {}", auth_url)))?
        .push("mfa")
        .push(segment);
    Ok(url)
}

/// Extract the code from a redirect, checking the returned state.
///
/// Returns `Ok(None)` for non-redirect responses.
fn redirect_code(
    response: &Response,
    base: &Url,
    expected_state: &str,
) -> Result<Option<String>, AuthError> {
    if !response.status().is_redirection() {
        return Ok(None);
    }

    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCode)?;
    let location = base
        .join(location)
        .map_err(|e| AuthError::LoginFailed(format!("invalid redirect: {}", e)))?;

    let params: HashMap<String, String> = location.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return Err(AuthError::LoginFailed(error.clone()));
    }
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }

    params
        .get("code")
        .cloned()
        .map(Some)
        .ok_or(AuthError::MissingCode)
}

/// Map a failed token request; RFC 6749 error bodies keep their error code.
fn token_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> AuthError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => AuthError::TokenRejected {
            error: response.error().to_string(),
            description: response.error_description().cloned(),
        },
        RequestTokenError::Request(err) => ApiError::Network(err.to_string()).into(),
        RequestTokenError::Parse(err, _) => ApiError::InvalidResponse(err.to_string()).into(),
        RequestTokenError::Other(msg) => ApiError::InvalidResponse(msg).into(),
    }
}

/// Collect `<input type="hidden">` name/value pairs from a login page
fn hidden_inputs(html: &str) -> HashMap<String, String> {
    html.split("<input")
        .skip(1)
        .filter_map(|tag| {
            let tag = tag.split('>').next()?;
            if !attribute(tag, "type")?.eq_ignore_ascii_case("hidden") {
                return None;
            }
            let name = attribute(tag, "name")?;
            let value = attribute(tag, "value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Quoted attribute value; the name may follow any whitespace and the value
/// may use either quote style.
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = tag;
    while let Some(pos) = rest.find(name) {
        let preceded = rest[..pos]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_whitespace());
        let after = rest[pos + name.len()..].trim_start();
        rest = &rest[pos + name.len()..];

        if !preceded {
            continue;
        }
        let Some(after) = after.strip_prefix('=') else {
            continue;
        };
        let after = after.trim_start();
        let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let value = &after[1..];
        let end = value.find(quote)?;
        return Some(&value[..end]);
    }
    None
}

/// Shared token state handed to request signers.
///
/// Only the owning [`Identity`] stores new tokens; readers trigger a
/// `refresh_token` grant when the access token is about to expire.
#[derive(Clone)]
pub struct TokenHandle {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    config: OAuthConfig,
    http: HttpClient,
    tokens: RwLock<Option<TokenSet>>,
}

impl TokenHandle {
    fn new(config: OAuthConfig, http: HttpClient, tokens: Option<TokenSet>) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                config,
                http,
                tokens: RwLock::new(tokens),
            }),
        }
    }

    /// Current token set, if any
    pub async fn current(&self) -> Option<TokenSet> {
        self.inner.tokens.read().await.clone()
    }

    async fn store(&self, tokens: TokenSet) {
        *self.inner.tokens.write().await = Some(tokens);
    }

    /// A rejected refresh token means the user has to log in again.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, ApiError> {
        log::debug!("Refreshing access token");

        let config = &self.inner.config;
        let client = config.client();
        let refresh = RefreshToken::new(refresh_token.to_string());
        let response = client
            .exchange_refresh_token(&refresh)
            .add_scopes(config.oauth_scopes())
            .request_async(&self.inner.http)
            .await
            .map_err(|err| match token_error(err) {
                AuthError::Api(err) => err,
                rejected => {
                    log::warn!("Token refresh failed: {}", rejected);
                    ApiError::Unauthorized
                }
            })?;

        Ok(TokenSet::from_response(&response, Some(refresh_token)))
    }
}

#[async_trait]
impl TokenSource for TokenHandle {
    async fn access_token(&self) -> Result<String, ApiError> {
        {
            let tokens = self.inner.tokens.read().await;
            match tokens.as_ref() {
                None => return Err(ApiError::Unauthorized),
                Some(t) if !t.is_expired() => return Ok(t.access_token.clone()),
                Some(_) => {}
            }
        }

        // Re-check under the write lock so concurrent readers refresh once
        let mut tokens = self.inner.tokens.write().await;
        let refresh_token = match tokens.as_ref() {
            None => return Err(ApiError::Unauthorized),
            Some(t) if !t.is_expired() => return Ok(t.access_token.clone()),
            Some(t) if t.refresh_token.is_empty() => return Err(ApiError::Unauthorized),
            Some(t) => t.refresh_token.clone(),
        };

        let fresh = self.refresh(&refresh_token).await?;
        let access_token = fresh.access_token.clone();
        *tokens = Some(fresh);

        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PasscodeDevice;
    use chrono::Utc;
    use mockito::{Matcher, Server};

    const LOGIN_PAGE: &str = r#"<form method="post">
        <input type="hidden" name="_csrf" value="csrf-token" />
        <input type="hidden" name="transaction_id" value="tx-42" />
        <input type="email" name="identity" value="" />
        </form>"#;

    const MFA_PAGE: &str = r#"<html><a href="/oauth2/v3/authorize/mfa/verify">Verify</a></html>"#;

    fn identity(server: &Server) -> Identity {
        let config = OAuthConfig::tesla()
            .with_auth_url(
                format!("{}/oauth2/v3/authorize", server.url())
                    .parse()
                    .unwrap(),
            )
            .with_token_url(format!("{}/oauth2/v3/token", server.url()).parse().unwrap());
        Identity::new(config).unwrap()
    }

    fn callback(state: &str) -> String {
        format!("{}?code=auth-code&state={}", TESLA_REDIRECT_URI, state)
    }

    async fn mock_login_page(server: &mut Server) -> mockito::Mock {
        server
            .mock("GET", "/oauth2/v3/authorize")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(LOGIN_PAGE)
            .create_async()
            .await
    }

    async fn mock_token(server: &mut Server, verifier: &str) -> mockito::Mock {
        server
            .mock("POST", "/oauth2/v3/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "auth-code".into()),
                Matcher::UrlEncoded("code_verifier".into(), verifier.into()),
                Matcher::UrlEncoded("client_id".into(), "ownerapi".into()),
                Matcher::UrlEncoded("redirect_uri".into(), TESLA_REDIRECT_URI.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"access-1","refresh_token":"refresh-1","expires_in":28800,"token_type":"Bearer"}"#,
            )
            .create_async()
            .await
    }

    #[test]
    fn test_hidden_inputs() {
        let inputs = hidden_inputs(LOGIN_PAGE);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs["_csrf"], "csrf-token");
        assert_eq!(inputs["transaction_id"], "tx-42");
    }

    #[test]
    fn test_hidden_inputs_tolerates_layout_and_quotes() {
        let page = "<form>\n<input\n    type=\"hidden\"\n\tname='_phase'  value='authenticate'>\n\
            <input type = 'HIDDEN' name=\"cancel\" value=\"\" />\n\
            <input data-name=\"x\" type=\"hidden\" name=\"_process\" value=\"1\">\n\
            <input type=\"text\" name=\"identity\" value=\"name\"></form>";
        let inputs = hidden_inputs(page);

        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs["_phase"], "authenticate");
        assert_eq!(inputs["cancel"], "");
        assert_eq!(inputs["_process"], "1");
    }

    #[test]
    fn test_attribute_requires_whole_name() {
        let tag = r#" data-value="wrong" value="right""#;
        assert_eq!(attribute(tag, "value"), Some("right"));
        assert_eq!(attribute(tag, "name"), None);
        assert_eq!(attribute(" value=unquoted", "value"), None);
    }

    #[test]
    fn test_mfa_url() {
        let url: Url = "https://auth.tesla.com/oauth2/v3/authorize?client_id=ownerapi"
            .parse()
            .unwrap();
        assert_eq!(
            mfa_url(&url, "factors").unwrap().as_str(),
            "https://auth.tesla.com/oauth2/v3/authorize/mfa/factors"
        );
    }

    #[test]
    fn test_tesla_defaults() {
        let config = OAuthConfig::tesla();
        assert_eq!(config.client_id(), "ownerapi");
        assert_eq!(config.auth_url().as_str(), TESLA_AUTH_URL);
        assert_eq!(config.scopes(), &["openid", "email", "offline_access"]);
    }

    #[tokio::test]
    async fn test_phases_enforced() {
        let server = Server::new_async().await;
        let mut identity = identity(&server);
        assert_eq!(identity.phase(), AuthPhase::Idle);

        let err = identity.login("user", "pass").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::InvalidState {
                expected: AuthPhase::SessionStarted,
                actual: AuthPhase::Idle,
            }
        );

        let err = identity.exchange_token().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidState { .. }));

        identity.start_session().unwrap();
        assert_eq!(identity.phase(), AuthPhase::SessionStarted);
        assert!(identity.start_session().is_err());
        assert_eq!(identity.phase(), AuthPhase::SessionStarted);
    }

    #[tokio::test]
    async fn test_login_and_exchange_with_matching_verifier() {
        let mut server = Server::new_async().await;
        let mut identity = identity(&server);
        let session = identity.start_session().unwrap();
        let state = session.state().to_string();
        let verifier = session.verifier().to_string();

        let _page = mock_login_page(&mut server).await;
        let _post = server
            .mock("POST", "/oauth2/v3/authorize")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("identity".into(), "driver@example.com".into()),
                Matcher::UrlEncoded("credential".into(), "secret".into()),
                Matcher::UrlEncoded("_csrf".into(), "csrf-token".into()),
            ]))
            .with_status(302)
            .with_header("location", &callback(&state))
            .create_async()
            .await;
        let token = mock_token(&mut server, &verifier).await;

        identity.login("driver@example.com", "secret").await.unwrap();
        assert_eq!(identity.phase(), AuthPhase::CodeReceived);

        let tokens = identity.exchange_token().await.unwrap();
        token.assert_async().await;
        assert_eq!(tokens.access_token, "access-1");
        assert_eq!(tokens.refresh_token, "refresh-1");
        assert_eq!(identity.phase(), AuthPhase::TokenExchanged);
        assert!(identity.session().is_none());

        let source = identity.token_source();
        assert_eq!(source.access_token().await.unwrap(), "access-1");
    }

    #[tokio::test]
    async fn test_exchange_with_foreign_verifier_fails() {
        let mut server = Server::new_async().await;

        // The stub only honours the first session's verifier
        let mut first = identity(&server);
        let first_verifier = first.start_session().unwrap().verifier().to_string();
        let _token = mock_token(&mut server, &first_verifier).await;
        let _rejected = server
            .mock("POST", "/oauth2/v3/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"invalid_grant","error_description":"code verifier mismatch"}"#)
            .create_async()
            .await;

        let mut second = identity(&server);
        let state = second.start_session().unwrap().state().to_string();
        let _page = mock_login_page(&mut server).await;
        let _post = server
            .mock("POST", "/oauth2/v3/authorize")
            .match_query(Matcher::Any)
            .with_status(302)
            .with_header("location", &callback(&state))
            .create_async()
            .await;

        second.login("driver@example.com", "secret").await.unwrap();
        let err = second.exchange_token().await.unwrap_err();

        assert_eq!(
            err,
            AuthError::TokenRejected {
                error: "invalid_grant".to_string(),
                description: Some("code verifier mismatch".to_string()),
            }
        );
        assert_eq!(second.phase(), AuthPhase::Failed);
        assert!(second.token_source().current().await.is_none());
    }

    #[tokio::test]
    async fn test_state_mismatch_fails_login() {
        let mut server = Server::new_async().await;
        let mut identity = identity(&server);
        identity.start_session().unwrap();

        let _page = mock_login_page(&mut server).await;
        let _post = server
            .mock("POST", "/oauth2/v3/authorize")
            .match_query(Matcher::Any)
            .with_status(302)
            .with_header("location", &callback("forged"))
            .create_async()
            .await;

        let err = identity.login("u", "p").await.unwrap_err();
        assert_eq!(err, AuthError::StateMismatch);
        assert_eq!(identity.phase(), AuthPhase::Failed);
    }

    #[tokio::test]
    async fn test_wrong_credentials_fail_login() {
        let mut server = Server::new_async().await;
        let mut identity = identity(&server);
        identity.start_session().unwrap();

        let _page = mock_login_page(&mut server).await;
        let _post = server
            .mock("POST", "/oauth2/v3/authorize")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let err = identity.login("u", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::LoginFailed(_)));
        assert_eq!(identity.phase(), AuthPhase::Failed);
    }

    async fn mock_mfa_prompt(server: &mut Server) -> (mockito::Mock, mockito::Mock) {
        let post = server
            .mock("POST", "/oauth2/v3/authorize")
            .match_query(Matcher::Any)
            .match_body(Matcher::UrlEncoded("identity".into(), "u".into()))
            .with_status(200)
            .with_body(MFA_PAGE)
            .create_async()
            .await;
        let factors = server
            .mock("GET", "/oauth2/v3/authorize/mfa/factors")
            .match_query(Matcher::UrlEncoded("transaction_id".into(), "tx-42".into()))
            .with_status(200)
            .with_body(r#"{"data":[{"id":"factor-1","name":"Phone","factorType":"token:software"}]}"#)
            .create_async()
            .await;
        (post, factors)
    }

    #[tokio::test]
    async fn test_second_factor_without_handler_is_unsupported() {
        let mut server = Server::new_async().await;
        let mut identity = identity(&server);
        identity.start_session().unwrap();

        let _page = mock_login_page(&mut server).await;
        let _mfa = mock_mfa_prompt(&mut server).await;
        let verify = server
            .mock("POST", "/oauth2/v3/authorize/mfa/verify")
            .expect(0)
            .create_async()
            .await;

        let err = identity.login("u", "p").await.unwrap_err();

        assert_eq!(err, AuthError::MfaUnsupported);
        assert_eq!(identity.phase(), AuthPhase::Failed);
        verify.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_factor_with_passcode_device() {
        let mut server = Server::new_async().await;
        let mut identity = identity(&server).with_device_handler(PasscodeDevice::new("123456"));
        let state = identity.start_session().unwrap().state().to_string();

        let _page = mock_login_page(&mut server).await;
        let _mfa = mock_mfa_prompt(&mut server).await;
        let verify = server
            .mock("POST", "/oauth2/v3/authorize/mfa/verify")
            .match_body(Matcher::Json(serde_json::json!({
                "transaction_id": "tx-42",
                "factor_id": "factor-1",
                "passcode": "123456"
            })))
            .with_status(200)
            .with_body(r#"{"data":{"valid":true,"approved":true,"flagged":false}}"#)
            .create_async()
            .await;
        let _code = server
            .mock("POST", "/oauth2/v3/authorize")
            .match_query(Matcher::Any)
            .match_body(Matcher::Exact("transaction_id=tx-42".into()))
            .with_status(302)
            .with_header("location", &callback(&state))
            .create_async()
            .await;

        identity.login("u", "p").await.unwrap();

        verify.assert_async().await;
        assert_eq!(identity.phase(), AuthPhase::CodeReceived);
    }

    #[tokio::test]
    async fn test_rejected_passcode() {
        let mut server = Server::new_async().await;
        let mut identity = identity(&server).with_device_handler(PasscodeDevice::new("000000"));
        identity.start_session().unwrap();

        let _page = mock_login_page(&mut server).await;
        let _mfa = mock_mfa_prompt(&mut server).await;
        let _verify = server
            .mock("POST", "/oauth2/v3/authorize/mfa/verify")
            .with_status(200)
            .with_body(r#"{"data":{"valid":false}}"#)
            .create_async()
            .await;

        let err = identity.login("u", "p").await.unwrap_err();
        assert_eq!(err, AuthError::MfaRejected);
    }

    #[tokio::test]
    async fn test_token_source_refreshes_expired_token() {
        let mut server = Server::new_async().await;
        let refresh = server
            .mock("POST", "/oauth2/v3/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "old-refresh".into()),
                Matcher::UrlEncoded("client_id".into(), "ownerapi".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"new-access","token_type":"Bearer","expires_in":28800}"#)
            .expect(1)
            .create_async()
            .await;

        let identity = identity(&server).with_tokens(TokenSet {
            access_token: "old-access".to_string(),
            refresh_token: "old-refresh".to_string(),
            expiry: Utc::now() - chrono::Duration::minutes(1),
        });
        let source = identity.token_source();

        assert_eq!(source.access_token().await.unwrap(), "new-access");
        assert_eq!(source.access_token().await.unwrap(), "new-access");
        refresh.assert_async().await;

        let current = source.current().await.unwrap();
        assert_eq!(current.refresh_token, "old-refresh");
    }

    #[tokio::test]
    async fn test_rejected_refresh_token_is_unauthorized() {
        let mut server = Server::new_async().await;
        let _refresh = server
            .mock("POST", "/oauth2/v3/token")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let identity = identity(&server).with_tokens(TokenSet {
            access_token: "old-access".to_string(),
            refresh_token: "revoked".to_string(),
            expiry: Utc::now() - chrono::Duration::minutes(1),
        });

        assert_eq!(
            identity.token_source().access_token().await,
            Err(ApiError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_exchange_with_malformed_token_response() {
        let mut server = Server::new_async().await;
        let mut identity = identity(&server);
        let state = identity.start_session().unwrap().state().to_string();

        let _page = mock_login_page(&mut server).await;
        let _post = server
            .mock("POST", "/oauth2/v3/authorize")
            .match_query(Matcher::Any)
            .with_status(302)
            .with_header("location", &callback(&state))
            .create_async()
            .await;
        let _token = server
            .mock("POST", "/oauth2/v3/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"unexpected":true}"#)
            .create_async()
            .await;

        identity.login("u", "p").await.unwrap();
        let err = identity.exchange_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Api(ApiError::InvalidResponse(_))));
        assert_eq!(identity.phase(), AuthPhase::Failed);
    }

    #[tokio::test]
    async fn test_token_source_without_tokens() {
        let server = Server::new_async().await;
        let identity = identity(&server);

        assert_eq!(
            identity.token_source().access_token().await,
            Err(ApiError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_authenticate_reports_vendor_error() {
        let mut server = Server::new_async().await;
        let mut identity = identity(&server);
        identity.start_session().unwrap();

        let _page = mock_login_page(&mut server).await;
        let _denied = server
            .mock("POST", "/oauth2/v3/authorize")
            .match_query(Matcher::Any)
            .with_status(302)
            .with_header("location", &format!("{}?error=login_required", TESLA_REDIRECT_URI))
            .create_async()
            .await;

        let err = identity.authenticate("u", "p").await.unwrap_err();
        assert_eq!(err, AuthError::LoginFailed("login_required".to_string()));
        assert_eq!(identity.phase(), AuthPhase::Failed);
    }
}

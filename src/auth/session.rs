//! Per-attempt PKCE session and login phases

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenUrl,
};
use reqwest::Url;

/// 87 random bytes encode to a 116 character verifier (RFC 7636 allows 43-128).
const VERIFIER_BYTES: u32 = 87;

/// 9 random bytes encode to a 12 character `state`.
const STATE_BYTES: u32 = 9;

/// OAuth client with authorization and token endpoints configured
pub(crate) type OAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Static OAuth client metadata for a vendor identity provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create a new configuration
    pub fn new(
        client_id: impl Into<String>,
        auth_url: Url,
        token_url: Url,
        redirect_uri: Url,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            auth_url,
            token_url,
            redirect_uri,
            scopes,
        }
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Public client (no secret); `client_id` travels in the request body.
    pub(crate) fn client(&self) -> OAuthClient {
        BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_uri(AuthUrl::from_url(self.auth_url.clone()))
            .set_token_uri(TokenUrl::from_url(self.token_url.clone()))
            .set_redirect_uri(RedirectUrl::from_url(self.redirect_uri.clone()))
    }

    pub(crate) fn oauth_scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        self.scopes.iter().cloned().map(Scope::new)
    }
}

/// One login attempt's PKCE material.
///
/// Consumed by the token exchange and never reused.
#[derive(Debug)]
pub struct AuthSession {
    verifier: PkceCodeVerifier,
    challenge: String,
    state: CsrfToken,
    authorization_url: Url,
}

impl AuthSession {
    /// Generate an S256 challenge pair and state, and compose the authorization URL.
    pub fn start(config: &OAuthConfig) -> Self {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256_len(VERIFIER_BYTES);
        let challenge_text = challenge.as_str().to_string();

        let (authorization_url, state) = config
            .client()
            .authorize_url(|| CsrfToken::new_random_len(STATE_BYTES))
            .add_scopes(config.oauth_scopes())
            .add_extra_param("access_type", "offline")
            .set_pkce_challenge(challenge)
            .url();

        Self {
            verifier,
            challenge: challenge_text,
            state,
            authorization_url,
        }
    }

    pub fn verifier(&self) -> &str {
        self.verifier.secret()
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    pub fn state(&self) -> &str {
        self.state.secret()
    }

    pub fn authorization_url(&self) -> &Url {
        &self.authorization_url
    }

    /// Give up the verifier for the token exchange
    pub(crate) fn into_verifier(self) -> PkceCodeVerifier {
        self.verifier
    }
}

/// Observable phase of the login state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Idle,
    SessionStarted,
    AwaitingUserCredentials,
    AwaitingSecondFactor,
    CodeReceived,
    TokenExchanged,
    Failed,
}

/// Login state, owning the session while one is active.
#[derive(Debug)]
pub(crate) enum AuthState {
    Idle,
    SessionStarted(AuthSession),
    AwaitingUserCredentials(AuthSession),
    AwaitingSecondFactor(AuthSession),
    CodeReceived { session: AuthSession, code: String },
    TokenExchanged,
    Failed,
}

impl AuthState {
    pub fn phase(&self) -> AuthPhase {
        match self {
            AuthState::Idle => AuthPhase::Idle,
            AuthState::SessionStarted(_) => AuthPhase::SessionStarted,
            AuthState::AwaitingUserCredentials(_) => AuthPhase::AwaitingUserCredentials,
            AuthState::AwaitingSecondFactor(_) => AuthPhase::AwaitingSecondFactor,
            AuthState::CodeReceived { .. } => AuthPhase::CodeReceived,
            AuthState::TokenExchanged => AuthPhase::TokenExchanged,
            AuthState::Failed => AuthPhase::Failed,
        }
    }
}

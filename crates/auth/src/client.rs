//! Authorization flow adapter.
//!
//! [`AuthClient`] wraps the provider's endpoint triple behind the three
//! wire operations the controller needs: building the PKCE authorization
//! request, exchanging the redirect's code, and refreshing. Revocation is
//! best-effort on top. The browser prompt itself is not here: the host
//! opens the returned URL and feeds the redirect outcome back into the
//! controller.
//!
//! The adapter is stateless across calls except for the single pending
//! challenge held between `begin_authorization` and `exchange_code`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{AuthConfig, ProviderMetadata};
use crate::error::{ExchangeError, RefreshError};
use crate::pkce::PkceChallenge;
use crate::traits::AuthClientTrait;
use crate::types::{AuthorizationRequest, ProviderError, TokenRecord, TokenResponse};

/// Timeout for machine-to-machine token endpoint calls. The user-facing
/// prompt has no timeout; these do.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth2 authorization-code + PKCE client for a single provider.
pub struct AuthClient {
    config: AuthConfig,
    provider: ProviderMetadata,
    http: reqwest::Client,
    pending: Mutex<Option<PkceChallenge>>,
}

impl AuthClient {
    /// Create a client for the given application config and provider
    /// endpoints.
    #[must_use]
    pub fn new(config: AuthConfig, provider: ProviderMetadata) -> Self {
        let http = reqwest::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, provider, http, pending: Mutex::new(None) }
    }

    /// Application configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Provider endpoints this client talks to.
    #[must_use]
    pub fn provider(&self) -> &ProviderMetadata {
        &self.provider
    }

    /// Build the authorization request for the external browser prompt.
    ///
    /// Generates fresh PKCE material, stores it as the pending challenge,
    /// and assembles the authorization URL. A second call replaces any
    /// earlier pending challenge.
    pub async fn begin_authorization(&self) -> AuthorizationRequest {
        let challenge = PkceChallenge::generate();
        let state = challenge.state.clone();

        let redirect_uri = self.config.redirect_uri();
        let scope = self.config.scope_string();
        let params: [(&str, &str); 7] = [
            ("response_type", "code"),
            ("client_id", &self.config.client_id),
            ("redirect_uri", &redirect_uri),
            ("scope", &scope),
            ("state", &state),
            ("code_challenge", &challenge.code_challenge),
            ("code_challenge_method", challenge.challenge_method()),
        ];

        let query = params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}?{query}", self.provider.authorization_endpoint);

        *self.pending.lock().await = Some(challenge);
        debug!("authorization request built");

        AuthorizationRequest { url, state }
    }

    /// Exchange the redirect's authorization code for a token record.
    ///
    /// Consumes the pending challenge; the call is terminal whether it
    /// succeeds or not.
    ///
    /// # Errors
    /// Returns [`ExchangeError`] if no request is pending, the state does
    /// not match, the endpoint is unreachable, or the provider rejects the
    /// code.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
    ) -> Result<TokenRecord, ExchangeError> {
        let challenge =
            self.pending.lock().await.take().ok_or(ExchangeError::NoPendingRequest)?;

        if challenge.state != state {
            return Err(ExchangeError::StateMismatch {
                expected: challenge.state,
                received: state.to_string(),
            });
        }

        let redirect_uri = self.config.redirect_uri();
        let form: [(&str, &str); 5] = [
            ("grant_type", "authorization_code"),
            ("client_id", &self.config.client_id),
            ("code", code),
            ("redirect_uri", &redirect_uri),
            ("code_verifier", &challenge.code_verifier),
        ];

        let response = self.http.post(&self.provider.token_endpoint).form(&form).send().await?;
        let token_response = read_token_response(response).await.map_err(ExchangeError::from)?;

        debug!("authorization code exchanged");
        Ok(TokenRecord::from_response(token_response, Utc::now().timestamp()))
    }

    /// Mint a new token record from a refresh token.
    ///
    /// # Errors
    /// Returns [`RefreshError`] if the token is empty, the endpoint is
    /// unreachable, or the provider rejects the grant.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, RefreshError> {
        if refresh_token.is_empty() {
            return Err(RefreshError::NoRefreshToken);
        }

        let form: [(&str, &str); 3] = [
            ("grant_type", "refresh_token"),
            ("client_id", &self.config.client_id),
            ("refresh_token", refresh_token),
        ];

        let response = self.http.post(&self.provider.token_endpoint).form(&form).send().await?;
        let token_response = read_token_response(response).await.map_err(RefreshError::from)?;

        debug!("access token refreshed");
        Ok(TokenRecord::from_response(token_response, Utc::now().timestamp()))
    }

    /// Best-effort server-side revocation of a token.
    ///
    /// Returns `false` when the provider advertises no revocation endpoint
    /// or the call fails for any reason; the caller proceeds regardless.
    pub async fn revoke(&self, token: &str) -> bool {
        let Some(endpoint) = self.provider.revocation_endpoint.as_deref() else {
            debug!("provider advertises no revocation endpoint; skipping");
            return false;
        };

        let form: [(&str, &str); 2] =
            [("client_id", &self.config.client_id), ("token", token)];

        match self.http.post(endpoint).form(&form).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "token revocation rejected");
                false
            }
            Err(error) => {
                warn!(error = %error, "token revocation request failed");
                false
            }
        }
    }
}

#[async_trait]
impl AuthClientTrait for AuthClient {
    async fn begin_authorization(&self) -> AuthorizationRequest {
        self.begin_authorization().await
    }

    async fn exchange_code(&self, code: &str, state: &str) -> Result<TokenRecord, ExchangeError> {
        self.exchange_code(code, state).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, RefreshError> {
        self.refresh(refresh_token).await
    }

    async fn revoke(&self, token: &str) -> bool {
        self.revoke(token).await
    }
}

/// Failure modes shared by the two token endpoint calls.
enum TokenEndpointFailure {
    Provider(ProviderError),
    Parse(String),
}

impl From<TokenEndpointFailure> for ExchangeError {
    fn from(failure: TokenEndpointFailure) -> Self {
        match failure {
            TokenEndpointFailure::Provider(error) => Self::Provider(error),
            TokenEndpointFailure::Parse(message) => Self::Parse(message),
        }
    }
}

impl From<TokenEndpointFailure> for RefreshError {
    fn from(failure: TokenEndpointFailure) -> Self {
        match failure {
            TokenEndpointFailure::Provider(error) => Self::Provider(error),
            TokenEndpointFailure::Parse(message) => Self::Parse(message),
        }
    }
}

/// Read a token endpoint response: a success body on 2xx, the RFC 6749
/// error body otherwise.
async fn read_token_response(
    response: reqwest::Response,
) -> Result<TokenResponse, TokenEndpointFailure> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| TokenEndpointFailure::Parse(e.to_string()))?;

    if !status.is_success() {
        return match serde_json::from_str::<ProviderError>(&body) {
            Ok(error) => Err(TokenEndpointFailure::Provider(error)),
            Err(_) => Err(TokenEndpointFailure::Parse(format!(
                "token endpoint returned {status} with an unreadable body"
            ))),
        };
    }

    serde_json::from_str(&body).map_err(|e| TokenEndpointFailure::Parse(e.to_string()))
}

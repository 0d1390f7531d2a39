//! Core token and session state types.
//!
//! [`TokenRecord`] is the persisted unit of authentication state: the exact
//! four fields written to the session store, plus derived expiry arithmetic.
//! Everything else here is either a wire shape ([`TokenResponse`],
//! [`ProviderError`]) or a transient, derived view ([`SessionSnapshot`],
//! [`SessionPhase`]) that is recomputed from the record and the wall clock.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Persisted access/refresh token pair with its expiry metadata.
///
/// A record is only ever created from a token endpoint response (code
/// exchange or refresh) or loaded back from the session store. `expires_at`
/// and `remaining` are always derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Opaque bearer credential.
    pub access_token: String,

    /// Credential used to mint a new access token without re-prompting.
    /// Some refresh responses do not rotate it.
    pub refresh_token: Option<String>,

    /// When the access token was minted (seconds since epoch).
    pub issued_at: i64,

    /// Access token lifetime in seconds, counted from `issued_at`.
    pub expires_in: i64,
}

impl TokenRecord {
    /// Build a record from a token endpoint response, stamped with the time
    /// the response was received.
    #[must_use]
    pub fn from_response(response: TokenResponse, issued_at: i64) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            issued_at,
            expires_in: response.expires_in,
        }
    }

    /// Absolute expiry timestamp (seconds since epoch).
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.issued_at + self.expires_in
    }

    /// Seconds of validity left at `now`. Negative once expired.
    #[must_use]
    pub fn remaining(&self, now: i64) -> i64 {
        self.expires_at() - now
    }

    /// Whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.remaining(now) <= 0
    }
}

/// Token endpoint response body (RFC 6749 §5.1).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token endpoint error body (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
pub struct ProviderError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Lifecycle phase of the session.
///
/// `Refreshing` is only ever entered from startup reconciliation; `Expired`
/// is observed while an expired record is being discarded, before the
/// session settles as `Unauthenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticating,
    Refreshing,
    Authenticated,
    Expired,
}

/// Read model the host application consumes.
///
/// Recomputed from the current record and the wall clock on every query;
/// never a source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    /// Seconds of validity left on the access token; zero when signed out.
    pub expires_in: i64,
}

impl SessionSnapshot {
    pub(crate) const SIGNED_OUT: Self = Self { is_authenticated: false, expires_in: 0 };
}

/// Authorization request handed to the host for the external browser prompt.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Fully assembled authorization URL to open in the system browser.
    pub url: String,

    /// CSRF state; the redirect must carry it back unchanged.
    pub state: String,
}

/// Outcome of the external browser prompt, fed back into the controller.
///
/// The prompt itself waits indefinitely on the user; exactly one of these
/// is surfaced when the redirect (or its absence) resolves.
#[derive(Debug, Clone)]
pub enum PromptOutcome {
    /// Redirect returned with an authorization code.
    Success { code: String, state: String },

    /// The provider surfaced an error on the redirect.
    Error(String),

    /// The user dismissed the browser without completing the flow.
    Cancelled,
}

//! Error taxonomy for the session core.
//!
//! Each collaborator owns its error enum; the controller wraps them in
//! [`SessionError`] at the boundary it exposes to the host application.
//! Failure policy (who absorbs what) lives with the controller, not here.

use thiserror::Error;

use crate::types::ProviderError;

/// Failure of a session store backend.
///
/// Raised for genuine backend I/O problems only. A record that is merely
/// missing or unparseable is reported as absent by `load`, never as an error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform keychain (or other backend) rejected the operation.
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// Filesystem failure in the file backend.
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be encoded for persistence.
    #[error("storage encoding failure: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure while exchanging an authorization code for tokens.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// `exchange_code` was called with no authorization request in flight.
    #[error("no authorization request in flight")]
    NoPendingRequest,

    /// State parameter on the redirect did not match the pending request.
    #[error("state mismatch on redirect: expected {expected}, received {received}")]
    StateMismatch { expected: String, received: String },

    /// The token endpoint could not be reached (includes timeouts).
    #[error("token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint rejected the exchange.
    #[error("token endpoint rejected the code exchange: {0}")]
    Provider(ProviderError),

    /// The token endpoint answered with an unreadable body.
    #[error("token endpoint response could not be parsed: {0}")]
    Parse(String),
}

/// Failure while refreshing an access token.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The stored record carries no refresh token.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// The token endpoint could not be reached (includes timeouts).
    #[error("refresh request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint rejected the refresh (expired or revoked grant).
    #[error("token endpoint rejected the refresh: {0}")]
    Provider(ProviderError),

    /// The token endpoint answered with an unreadable body.
    #[error("refresh response could not be parsed: {0}")]
    Parse(String),
}

/// Failure while fetching provider metadata from an issuer.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The discovery document could not be fetched.
    #[error("discovery document fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The issuer answered with a non-success status.
    #[error("discovery endpoint returned {0}")]
    Status(reqwest::StatusCode),

    /// The discovery document could not be parsed.
    #[error("discovery document could not be parsed: {0}")]
    Parse(String),

    /// The discovery document omits a required endpoint.
    #[error("discovery document is missing the {0} endpoint")]
    MissingEndpoint(&'static str),
}

/// Controller-level error surfaced to the host application.
///
/// Whenever one of these is returned the session has already settled in a
/// consistent state (in practice: not authenticated).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session store failure.
    #[error("session store error: {0}")]
    Storage(#[from] StorageError),

    /// Code exchange failure after a successful redirect.
    #[error("code exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

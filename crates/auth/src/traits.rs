//! Dependency-injection seams between the controller and its collaborators.
//!
//! The controller only ever talks to these traits; the concrete
//! [`AuthClient`](crate::client::AuthClient) and store backends implement
//! them, and the doubles in [`testing`](crate::testing) stand in for them in
//! tests.

use async_trait::async_trait;

use crate::error::{ExchangeError, RefreshError, StorageError};
use crate::types::{AuthorizationRequest, TokenRecord};

/// Operations the authorization flow adapter offers the controller.
#[async_trait]
pub trait AuthClientTrait: Send + Sync {
    /// Build a fresh authorization request (PKCE challenge + CSRF state).
    ///
    /// Pure construction aside from random material; no I/O. The returned
    /// URL is opened externally; the matching verifier stays with the
    /// adapter until the code exchange consumes it.
    async fn begin_authorization(&self) -> AuthorizationRequest;

    /// Exchange an authorization code for a token record.
    ///
    /// Validates `state` against the pending request. One network
    /// round-trip with an explicit timeout.
    ///
    /// # Errors
    /// Returns [`ExchangeError`] on state mismatch, transport failure, or
    /// provider rejection; the attempt is terminal either way.
    async fn exchange_code(&self, code: &str, state: &str) -> Result<TokenRecord, ExchangeError>;

    /// Mint a new token record from a refresh token.
    ///
    /// # Errors
    /// Returns [`RefreshError`] on transport failure or provider rejection.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, RefreshError>;

    /// Best-effort server-side revocation. Never fails the caller; returns
    /// `false` on any failure.
    async fn revoke(&self, token: &str) -> bool;
}

/// Durable storage of the one token record this crate owns.
///
/// Both backends persist the same four string-keyed entries; which backend
/// backs the trait is decided once at startup and call sites only ever see
/// this interface.
#[async_trait]
pub trait SessionStoreTrait: Send + Sync {
    /// Persist the record, overwriting any previous one.
    ///
    /// # Errors
    /// Returns [`StorageError`] on backend I/O failure. A partial write on
    /// process death is a known, accepted risk; the loader treats the
    /// remnant as no session.
    async fn save(&self, record: &TokenRecord) -> Result<(), StorageError>;

    /// Load the stored record.
    ///
    /// Returns `None` when any required entry is missing or fails to parse;
    /// a malformed record is absent, not an error.
    ///
    /// # Errors
    /// Returns [`StorageError`] only for genuine backend I/O failure.
    async fn load(&self) -> Result<Option<TokenRecord>, StorageError>;

    /// Remove every stored entry. Idempotent.
    ///
    /// # Errors
    /// Returns [`StorageError`] on backend I/O failure.
    async fn clear(&self) -> Result<(), StorageError>;
}

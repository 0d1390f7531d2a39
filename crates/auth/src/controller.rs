//! Token lifecycle controller.
//!
//! The one component that mutates session state. It reconciles the stored
//! record with the wall clock on startup, drives login and logout, and
//! exposes the read model the UI consumes. The stored record is owned by
//! the session store; the controller holds only a transient, derived view.
//!
//! Lifecycle:
//!
//! ```text
//! Unauthenticated ──begin_login──► Authenticating ──exchange ok──► Authenticated
//!        ▲                              │                              │
//!        └──── error / cancelled ◄──────┘                              │
//!        ▲                                                             │
//!        └───── logout / expiry / refresh failure ◄────────────────────┘
//! ```
//!
//! Startup reconciliation additionally passes through `Refreshing` (token
//! near expiry) or `Expired` (token past expiry) before settling.
//!
//! Every storage or network call is awaited before a transition is
//! considered complete, and all authoritative writes serialize through one
//! internal mutex, so observers never see the in-memory state disagree
//! with the store.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{RefreshError, SessionError};
use crate::traits::{AuthClientTrait, SessionStoreTrait};
use crate::types::{AuthorizationRequest, PromptOutcome, SessionPhase, SessionSnapshot, TokenRecord};

/// Drives the session lifecycle against an auth client and a session store.
///
/// Constructed once at process start and handed (or shared via `Arc`) to
/// whatever consumes the read model; there is no ambient instance.
pub struct SessionController<C, S>
where
    C: AuthClientTrait + 'static,
    S: SessionStoreTrait + ?Sized + 'static,
{
    client: Arc<C>,
    store: Arc<S>,
    refresh_threshold: i64,
    current: RwLock<Option<TokenRecord>>,
    phase: RwLock<SessionPhase>,
    /// Serializes every operation that writes the authoritative record; a
    /// second writer waits for the first to settle instead of interleaving.
    write_gate: Mutex<()>,
}

impl<C, S> SessionController<C, S>
where
    C: AuthClientTrait + 'static,
    S: SessionStoreTrait + ?Sized + 'static,
{
    /// Create a controller.
    ///
    /// # Arguments
    /// * `client` - authorization flow adapter
    /// * `store` - session store backend selected for this platform
    /// * `refresh_threshold` - refresh the token at startup when it has at
    ///   most this many seconds of validity left
    #[must_use]
    pub fn new(client: C, store: Arc<S>, refresh_threshold: i64) -> Self {
        Self {
            client: Arc::new(client),
            store,
            refresh_threshold,
            current: RwLock::new(None),
            phase: RwLock::new(SessionPhase::Unauthenticated),
            write_gate: Mutex::new(()),
        }
    }

    /// Reconcile with the session store. Runs once per process launch.
    ///
    /// A stored record past its expiry is discarded rather than refreshed,
    /// even when a refresh token exists: no silent refresh-after-expiry. A
    /// record close to expiry (within the refresh threshold) is refreshed
    /// before the session is reported as live; a refresh failure ends the
    /// session and is never retried automatically.
    ///
    /// Storage and network failures degrade to an unauthenticated session
    /// instead of surfacing.
    pub async fn initialize(&self) -> SessionSnapshot {
        let _gate = self.write_gate.lock().await;

        let loaded = match self.store.load().await {
            Ok(loaded) => loaded,
            Err(error) => {
                warn!(error = %error, "session store unreadable at startup");
                None
            }
        };

        let Some(record) = loaded else {
            debug!("no stored session");
            self.settle_unauthenticated().await;
            return self.snapshot().await;
        };

        let now = now_epoch();
        let remaining = record.remaining(now);

        if remaining <= 0 {
            self.set_phase(SessionPhase::Expired).await;
            info!(expired_at = record.expires_at(), "stored access token expired; ending session");
            if let Err(error) = self.store.clear().await {
                warn!(error = %error, "failed to clear expired session");
            }
            self.settle_unauthenticated().await;
        } else if remaining <= self.refresh_threshold {
            self.set_phase(SessionPhase::Refreshing).await;
            info!(remaining, "access token near expiry; refreshing");
            self.refresh_and_persist(&record).await;
        } else {
            debug!(remaining, "access token valid");
            self.install(record).await;
        }

        self.snapshot().await
    }

    /// Start the login flow.
    ///
    /// Returns the authorization request for the host to open in the system
    /// browser; the session is `Authenticating` until the redirect outcome
    /// is fed to [`complete_login`](Self::complete_login).
    pub async fn begin_login(&self) -> AuthorizationRequest {
        let request = self.client.begin_authorization().await;
        self.set_phase(SessionPhase::Authenticating).await;
        info!("login initiated");
        request
    }

    /// Feed the redirect outcome back into the lifecycle.
    ///
    /// On a successful redirect the code is exchanged and the new record
    /// persisted before the session is reported as live. A failed exchange
    /// is terminal for the attempt: the session settles unauthenticated,
    /// the store is left untouched, and the user must re-initiate login.
    ///
    /// # Errors
    /// Returns the exchange or storage failure after the session has
    /// settled in a consistent (unauthenticated) state. An `Error` or
    /// `Cancelled` outcome is not an error here; it resolves to an
    /// unauthenticated snapshot.
    pub async fn complete_login(
        &self,
        outcome: PromptOutcome,
    ) -> Result<SessionSnapshot, SessionError> {
        let _gate = self.write_gate.lock().await;

        match outcome {
            PromptOutcome::Success { code, state } => {
                match self.client.exchange_code(&code, &state).await {
                    Ok(record) => {
                        if let Err(error) = self.store.save(&record).await {
                            warn!(error = %error, "failed to persist session after code exchange");
                            self.settle_unauthenticated().await;
                            return Err(SessionError::Storage(error));
                        }
                        self.install(record).await;
                        info!("login completed");
                        Ok(self.snapshot().await)
                    }
                    Err(error) => {
                        warn!(error = %error, "code exchange failed");
                        self.settle_unauthenticated().await;
                        Err(SessionError::Exchange(error))
                    }
                }
            }
            PromptOutcome::Error(reason) => {
                info!(reason = %reason, "authorization redirect returned an error");
                self.settle_unauthenticated().await;
                Ok(self.snapshot().await)
            }
            PromptOutcome::Cancelled => {
                debug!("login cancelled by user");
                self.settle_unauthenticated().await;
                Ok(self.snapshot().await)
            }
        }
    }

    /// End the session.
    ///
    /// Reads the stored token, attempts best-effort server-side revocation
    /// when one exists (a failure is logged, never blocking), then
    /// unconditionally clears the store. With nothing stored, revocation is
    /// skipped entirely.
    ///
    /// # Errors
    /// Returns the storage failure if the store could not be cleared; the
    /// in-memory session is unauthenticated regardless.
    pub async fn logout(&self) -> Result<SessionSnapshot, SessionError> {
        let _gate = self.write_gate.lock().await;

        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(error) => {
                warn!(error = %error, "session store unreadable during logout");
                None
            }
        };

        match stored {
            Some(record) => {
                let revoked = self.client.revoke(&record.access_token).await;
                debug!(revoked, "token revocation attempted");
            }
            None => debug!("no stored token; skipping revocation"),
        }

        let cleared = self.store.clear().await;
        self.settle_unauthenticated().await;
        info!("logged out");

        cleared?;
        Ok(self.snapshot().await)
    }

    /// Current read model, recomputed against the wall clock.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let phase = *self.phase.read().await;
        let current = self.current.read().await;

        match (phase, current.as_ref()) {
            (SessionPhase::Authenticated, Some(record)) => {
                let remaining = record.remaining(now_epoch()).max(0);
                SessionSnapshot { is_authenticated: remaining > 0, expires_in: remaining }
            }
            _ => SessionSnapshot::SIGNED_OUT,
        }
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> SessionPhase {
        *self.phase.read().await
    }

    /// Whether a live session exists right now.
    pub async fn is_authenticated(&self) -> bool {
        self.snapshot().await.is_authenticated
    }

    /// Configured refresh threshold in seconds.
    #[must_use]
    pub fn refresh_threshold(&self) -> i64 {
        self.refresh_threshold
    }

    /// Refresh `record` and persist the replacement. Any failure along the
    /// way ends the session: the store is cleared and nothing is retried.
    async fn refresh_and_persist(&self, record: &TokenRecord) {
        let refreshed = match record.refresh_token.as_deref() {
            Some(refresh_token) => self.client.refresh(refresh_token).await,
            None => Err(RefreshError::NoRefreshToken),
        };

        match refreshed {
            Ok(replacement) => {
                if let Err(error) = self.store.save(&replacement).await {
                    warn!(error = %error, "failed to persist refreshed session; ending session");
                    self.clear_store_best_effort().await;
                    self.settle_unauthenticated().await;
                    return;
                }
                info!("session refreshed");
                self.install(replacement).await;
            }
            Err(error) => {
                warn!(error = %error, "token refresh failed; ending session");
                self.clear_store_best_effort().await;
                self.settle_unauthenticated().await;
            }
        }
    }

    async fn clear_store_best_effort(&self) {
        if let Err(error) = self.store.clear().await {
            warn!(error = %error, "failed to clear session store");
        }
    }

    async fn install(&self, record: TokenRecord) {
        *self.current.write().await = Some(record);
        *self.phase.write().await = SessionPhase::Authenticated;
    }

    async fn settle_unauthenticated(&self) {
        *self.current.write().await = None;
        *self.phase.write().await = SessionPhase::Unauthenticated;
    }

    async fn set_phase(&self, phase: SessionPhase) {
        *self.phase.write().await = phase;
    }
}

fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    //! Unit tests for the lifecycle state machine, driven through the
    //! in-memory doubles.
    use super::*;
    use crate::error::ExchangeError;
    use crate::testing::{MemorySessionStore, MockAuthClient};

    fn record_issued_at(issued_at: i64, expires_in: i64) -> TokenRecord {
        TokenRecord {
            access_token: "stored-access".to_string(),
            refresh_token: Some("stored-refresh".to_string()),
            issued_at,
            expires_in,
        }
    }

    fn fresh_record(marker: &str) -> TokenRecord {
        TokenRecord {
            access_token: format!("{marker}-access"),
            refresh_token: Some(format!("{marker}-refresh")),
            issued_at: now_epoch(),
            expires_in: 86_400,
        }
    }

    fn controller(
        client: MockAuthClient,
        store: Arc<MemorySessionStore>,
        refresh_threshold: i64,
    ) -> SessionController<MockAuthClient, MemorySessionStore> {
        SessionController::new(client, store, refresh_threshold)
    }

    /// Validates startup with an empty store.
    ///
    /// Assertions:
    /// - Confirms the snapshot is `{is_authenticated: false, expires_in: 0}`.
    /// - Ensures no refresh was attempted.
    #[tokio::test]
    async fn startup_with_empty_store() {
        let store = Arc::new(MemorySessionStore::new());
        let client = MockAuthClient::new();
        let controller = controller(client.clone(), store.clone(), 3_600);

        let snapshot = controller.initialize().await;

        assert_eq!(snapshot, SessionSnapshot { is_authenticated: false, expires_in: 0 });
        assert_eq!(controller.phase().await, SessionPhase::Unauthenticated);
        assert_eq!(client.refresh_calls(), 0);
        assert!(store.is_empty().await);
    }

    /// Validates startup with a token comfortably inside its lifetime.
    ///
    /// Assertions:
    /// - Confirms the session is live without any network call.
    /// - Confirms the reported remaining lifetime reflects the stored
    ///   record.
    #[tokio::test]
    async fn startup_with_valid_token() {
        let store = Arc::new(MemorySessionStore::new());
        store.save(&record_issued_at(now_epoch(), 86_400)).await.expect("seed store");

        let client = MockAuthClient::new();
        let controller = controller(client.clone(), store.clone(), 3_600);

        let snapshot = controller.initialize().await;

        assert!(snapshot.is_authenticated);
        assert!(snapshot.expires_in > 80_000);
        assert_eq!(controller.phase().await, SessionPhase::Authenticated);
        assert_eq!(client.refresh_calls(), 0);
    }

    /// Validates startup with a token inside the refresh threshold.
    ///
    /// The reconciliation must pass through the refreshing state, replace
    /// the record wholesale via the auth client, and persist the
    /// replacement.
    #[tokio::test]
    async fn startup_near_expiry_refreshes() {
        let store = Arc::new(MemorySessionStore::new());
        let issued_at = now_epoch() - 100;
        store.save(&record_issued_at(issued_at, 3_600)).await.expect("seed store");

        let client = MockAuthClient::new();
        client.stage_refresh(Ok(fresh_record("minted")));
        let controller = controller(client.clone(), store.clone(), 3_600);

        let snapshot = controller.initialize().await;

        assert!(snapshot.is_authenticated);
        assert_eq!(client.refresh_calls(), 1);
        assert_eq!(client.last_refresh_token().as_deref(), Some("stored-refresh"));

        // No field of the old record survives; the refresh response is
        // authoritative.
        let persisted = store.load().await.expect("load").expect("record present");
        assert_eq!(persisted.access_token, "minted-access");
        assert_eq!(persisted.refresh_token.as_deref(), Some("minted-refresh"));
    }

    /// Validates startup with an expired token.
    ///
    /// Assertions:
    /// - Confirms the session settles unauthenticated.
    /// - Confirms the store is cleared.
    /// - Ensures no refresh is attempted even though a refresh token was
    ///   stored.
    #[tokio::test]
    async fn startup_with_expired_token_clears_store() {
        let store = Arc::new(MemorySessionStore::new());
        let issued_at = now_epoch() - 4_000;
        store.save(&record_issued_at(issued_at, 3_600)).await.expect("seed store");

        let client = MockAuthClient::new();
        let controller = controller(client.clone(), store.clone(), 3_600);

        let snapshot = controller.initialize().await;

        assert!(!snapshot.is_authenticated);
        assert_eq!(snapshot.expires_in, 0);
        assert_eq!(controller.phase().await, SessionPhase::Unauthenticated);
        assert_eq!(client.refresh_calls(), 0);
        assert!(store.is_empty().await);
    }

    /// Validates that a refresh failure at startup ends the session
    /// terminally.
    ///
    /// Assertions:
    /// - Confirms exactly one refresh attempt (no automatic retry).
    /// - Confirms the store is cleared and the session unauthenticated.
    #[tokio::test]
    async fn startup_refresh_failure_is_terminal() {
        let store = Arc::new(MemorySessionStore::new());
        store.save(&record_issued_at(now_epoch() - 100, 3_600)).await.expect("seed store");

        let client = MockAuthClient::new();
        client.stage_refresh(Err(RefreshError::NoRefreshToken));
        let controller = controller(client.clone(), store.clone(), 3_600);

        let snapshot = controller.initialize().await;

        assert!(!snapshot.is_authenticated);
        assert_eq!(client.refresh_calls(), 1);
        assert!(store.is_empty().await);
    }

    /// Validates that an unreadable store degrades to signed-out instead of
    /// failing startup.
    #[tokio::test]
    async fn startup_with_failing_store_degrades() {
        let store = Arc::new(MemorySessionStore::new());
        store.fail_next_operation();

        let controller = controller(MockAuthClient::new(), store, 3_600);
        let snapshot = controller.initialize().await;

        assert_eq!(snapshot, SessionSnapshot { is_authenticated: false, expires_in: 0 });
    }

    /// Validates the full login round trip.
    ///
    /// Assertions:
    /// - Confirms the phase passes through `Authenticating`.
    /// - Confirms the exchanged record is persisted and the session live.
    #[tokio::test]
    async fn login_round_trip() {
        let store = Arc::new(MemorySessionStore::new());
        let client = MockAuthClient::new();
        client.stage_exchange(Ok(fresh_record("login")));
        let controller = controller(client.clone(), store.clone(), 3_600);
        controller.initialize().await;

        let request = controller.begin_login().await;
        assert_eq!(controller.phase().await, SessionPhase::Authenticating);

        let snapshot = controller
            .complete_login(PromptOutcome::Success {
                code: "auth-code".to_string(),
                state: request.state,
            })
            .await
            .expect("login completes");

        assert!(snapshot.is_authenticated);
        assert_eq!(controller.phase().await, SessionPhase::Authenticated);

        let persisted = store.load().await.expect("load").expect("record present");
        assert_eq!(persisted.access_token, "login-access");
    }

    /// Validates that a failed code exchange leaves the store untouched and
    /// the session unauthenticated.
    #[tokio::test]
    async fn failed_exchange_leaves_store_untouched() {
        let store = Arc::new(MemorySessionStore::new());
        let client = MockAuthClient::new();
        client.stage_exchange(Err(ExchangeError::NoPendingRequest));
        let controller = controller(client.clone(), store.clone(), 3_600);
        controller.initialize().await;

        controller.begin_login().await;
        let result = controller
            .complete_login(PromptOutcome::Success {
                code: "auth-code".to_string(),
                state: "state".to_string(),
            })
            .await;

        assert!(matches!(result, Err(SessionError::Exchange(_))));
        assert_eq!(controller.phase().await, SessionPhase::Unauthenticated);
        assert!(store.is_empty().await);
    }

    /// Validates that an error redirect resolves to signed-out without
    /// persisting anything.
    #[tokio::test]
    async fn error_redirect_resolves_signed_out() {
        let store = Arc::new(MemorySessionStore::new());
        let client = MockAuthClient::new();
        let controller = controller(client.clone(), store.clone(), 3_600);

        controller.begin_login().await;
        let snapshot = controller
            .complete_login(PromptOutcome::Error("access_denied".to_string()))
            .await
            .expect("outcome resolves");

        assert!(!snapshot.is_authenticated);
        assert_eq!(client.exchange_calls(), 0);
        assert!(store.is_empty().await);
    }

    /// Validates that a cancelled prompt resolves to signed-out without
    /// persisting anything.
    #[tokio::test]
    async fn cancelled_prompt_resolves_signed_out() {
        let store = Arc::new(MemorySessionStore::new());
        let client = MockAuthClient::new();
        let controller = controller(client.clone(), store.clone(), 3_600);

        controller.begin_login().await;
        let snapshot =
            controller.complete_login(PromptOutcome::Cancelled).await.expect("outcome resolves");

        assert!(!snapshot.is_authenticated);
        assert_eq!(client.exchange_calls(), 0);
        assert!(store.is_empty().await);
    }

    /// Validates logout with a live session: revocation attempted, store
    /// cleared.
    #[tokio::test]
    async fn logout_revokes_and_clears() {
        let store = Arc::new(MemorySessionStore::new());
        store.save(&record_issued_at(now_epoch(), 86_400)).await.expect("seed store");

        let client = MockAuthClient::new();
        let controller = controller(client.clone(), store.clone(), 3_600);
        controller.initialize().await;
        assert!(controller.is_authenticated().await);

        let snapshot = controller.logout().await.expect("logout completes");

        assert!(!snapshot.is_authenticated);
        assert_eq!(client.revoke_calls(), 1);
        assert!(store.is_empty().await);
    }

    /// Validates logout with no stored token: revocation skipped, store
    /// stays clear.
    #[tokio::test]
    async fn logout_without_token_skips_revocation() {
        let store = Arc::new(MemorySessionStore::new());
        let client = MockAuthClient::new();
        let controller = controller(client.clone(), store.clone(), 3_600);
        controller.initialize().await;

        let snapshot = controller.logout().await.expect("logout completes");

        assert!(!snapshot.is_authenticated);
        assert_eq!(client.revoke_calls(), 0);
        assert!(store.is_empty().await);
    }

    /// Validates that logout completes even when revocation fails.
    #[tokio::test]
    async fn logout_survives_failed_revocation() {
        let store = Arc::new(MemorySessionStore::new());
        store.save(&record_issued_at(now_epoch(), 86_400)).await.expect("seed store");

        let client = MockAuthClient::new();
        client.set_revoke_result(false);
        let controller = controller(client.clone(), store.clone(), 3_600);
        controller.initialize().await;

        let snapshot = controller.logout().await.expect("logout completes");

        assert!(!snapshot.is_authenticated);
        assert_eq!(client.revoke_calls(), 1);
        assert!(store.is_empty().await);
    }

    /// Validates that concurrent writers serialize instead of interleaving:
    /// a logout racing a login settles with the store and the snapshot in
    /// agreement.
    #[tokio::test]
    async fn concurrent_writers_serialize() {
        let store = Arc::new(MemorySessionStore::new());
        let client = MockAuthClient::new();
        client.stage_exchange(Ok(fresh_record("race")));
        let controller =
            Arc::new(controller(client.clone(), store.clone(), 3_600));

        let request = controller.begin_login().await;
        let login = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                controller
                    .complete_login(PromptOutcome::Success {
                        code: "auth-code".to_string(),
                        state: request.state,
                    })
                    .await
            })
        };
        let logout = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.logout().await })
        };

        login.await.expect("join").expect("login settles");
        logout.await.expect("join").expect("logout settles");

        // Whichever write settled last, memory and store agree.
        let snapshot = controller.snapshot().await;
        let stored = store.load().await.expect("load");
        assert_eq!(snapshot.is_authenticated, stored.is_some());
    }
}

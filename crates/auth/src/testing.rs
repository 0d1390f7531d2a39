//! In-memory doubles for exercising the session lifecycle without a
//! provider or a platform credential store.
//!
//! [`MemorySessionStore`] persists the same four string-keyed entries the
//! real backends do, so the all-or-nothing load semantics are exercised for
//! real; [`MockAuthClient`] plays scripted token endpoint responses and
//! counts calls. Both share their state across clones, so a test can keep a
//! handle while the controller owns another.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{ExchangeError, RefreshError, StorageError};
use crate::store::{
    record_from_entries, KEY_ACCESS_TOKEN, KEY_EXPIRES_IN, KEY_ISSUED_AT, KEY_REFRESH_TOKEN,
};
use crate::traits::{AuthClientTrait, SessionStoreTrait};
use crate::types::{AuthorizationRequest, TokenRecord};

/// Session store that keeps the four entries in a shared in-memory map.
///
/// `fail_next_operation` arms a one-shot backend failure for whichever
/// store operation runs next, for exercising degradation paths.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_next: Arc<AtomicBool>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save`, `load`, or `clear` fail with a backend error.
    pub fn fail_next_operation(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Whether no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Raw entry access, for asserting on the persisted layout.
    pub async fn entry(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn take_failure(&self) -> Result<(), StorageError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Backend("injected backend failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStoreTrait for MemorySessionStore {
    async fn save(&self, record: &TokenRecord) -> Result<(), StorageError> {
        self.take_failure()?;

        let mut entries = self.entries.lock().unwrap();
        entries.insert(KEY_ACCESS_TOKEN.to_string(), record.access_token.clone());
        match &record.refresh_token {
            Some(refresh_token) => {
                entries.insert(KEY_REFRESH_TOKEN.to_string(), refresh_token.clone());
            }
            None => {
                entries.remove(KEY_REFRESH_TOKEN);
            }
        }
        entries.insert(KEY_EXPIRES_IN.to_string(), record.expires_in.to_string());
        entries.insert(KEY_ISSUED_AT.to_string(), record.issued_at.to_string());
        Ok(())
    }

    async fn load(&self) -> Result<Option<TokenRecord>, StorageError> {
        self.take_failure()?;

        let entries = self.entries.lock().unwrap();
        Ok(record_from_entries(
            entries.get(KEY_ACCESS_TOKEN).cloned(),
            entries.get(KEY_REFRESH_TOKEN).cloned(),
            entries.get(KEY_EXPIRES_IN).cloned(),
            entries.get(KEY_ISSUED_AT).cloned(),
        ))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.take_failure()?;
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

/// Auth client that plays scripted responses and records what it was asked.
///
/// Unscripted exchange or refresh calls fail, so a test that expects no
/// network activity catches an unexpected call through the counters.
#[derive(Clone, Default)]
pub struct MockAuthClient {
    exchange_response: Arc<Mutex<Option<Result<TokenRecord, ExchangeError>>>>,
    refresh_response: Arc<Mutex<Option<Result<TokenRecord, RefreshError>>>>,
    last_refresh_token: Arc<Mutex<Option<String>>>,
    exchange_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
    revoke_calls: Arc<AtomicUsize>,
    revoke_ok: Arc<AtomicBool>,
}

impl MockAuthClient {
    /// Create a client with nothing scripted; revocation reports success.
    #[must_use]
    pub fn new() -> Self {
        let client = Self::default();
        client.revoke_ok.store(true, Ordering::SeqCst);
        client
    }

    /// Script the next `exchange_code` result.
    pub fn stage_exchange(&self, result: Result<TokenRecord, ExchangeError>) {
        *self.exchange_response.lock().unwrap() = Some(result);
    }

    /// Script the next `refresh` result.
    pub fn stage_refresh(&self, result: Result<TokenRecord, RefreshError>) {
        *self.refresh_response.lock().unwrap() = Some(result);
    }

    /// Set what `revoke` reports.
    pub fn set_revoke_result(&self, ok: bool) {
        self.revoke_ok.store(ok, Ordering::SeqCst);
    }

    /// Number of `exchange_code` calls observed.
    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Number of `refresh` calls observed.
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of `revoke` calls observed.
    #[must_use]
    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    /// The refresh token passed to the most recent `refresh` call.
    #[must_use]
    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthClientTrait for MockAuthClient {
    async fn begin_authorization(&self) -> AuthorizationRequest {
        AuthorizationRequest {
            url: "https://login.example/authorize?client_id=mock".to_string(),
            state: "mock-state".to_string(),
        }
    }

    async fn exchange_code(&self, _code: &str, _state: &str) -> Result<TokenRecord, ExchangeError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange_response
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ExchangeError::NoPendingRequest))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, RefreshError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock().unwrap() = Some(refresh_token.to_string());
        self.refresh_response
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(RefreshError::NoRefreshToken))
    }

    async fn revoke(&self, _token: &str) -> bool {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        self.revoke_ok.load(Ordering::SeqCst)
    }
}

//! Keychain session store.
//!
//! Persists the four entries as individual credentials in the platform
//! keychain (macOS Keychain, Windows Credential Manager, Linux Secret
//! Service), one `keyring` entry per key under a shared service name.

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::{
    record_from_entries, KEY_ACCESS_TOKEN, KEY_EXPIRES_IN, KEY_ISSUED_AT, KEY_REFRESH_TOKEN,
};
use crate::error::StorageError;
use crate::traits::SessionStoreTrait;
use crate::types::TokenRecord;

/// Session store backed by the platform credential store.
pub struct KeychainSessionStore {
    service_name: String,
}

impl KeychainSessionStore {
    /// Create a store namespaced under the given service name
    /// (e.g. `"Florence.auth"`).
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            StorageError::Backend(format!("failed to open keychain entry {key}: {e}"))
        })
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Backend(format!(
                "failed to read keychain entry {key}: {e}"
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value).map_err(|e| {
            StorageError::Backend(format!("failed to write keychain entry {key}: {e}"))
        })
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::Backend(format!(
                "failed to delete keychain entry {key}: {e}"
            ))),
        }
    }
}

#[async_trait]
impl SessionStoreTrait for KeychainSessionStore {
    async fn save(&self, record: &TokenRecord) -> Result<(), StorageError> {
        self.set(KEY_ACCESS_TOKEN, &record.access_token)?;
        match &record.refresh_token {
            Some(refresh_token) => self.set(KEY_REFRESH_TOKEN, refresh_token)?,
            // The new record is authoritative; a stale refresh token from an
            // earlier session must not survive it.
            None => self.delete(KEY_REFRESH_TOKEN)?,
        }
        self.set(KEY_EXPIRES_IN, &record.expires_in.to_string())?;
        self.set(KEY_ISSUED_AT, &record.issued_at.to_string())?;

        debug!(service = %self.service_name, "session record written to keychain");
        Ok(())
    }

    async fn load(&self) -> Result<Option<TokenRecord>, StorageError> {
        Ok(record_from_entries(
            self.get(KEY_ACCESS_TOKEN)?,
            self.get(KEY_REFRESH_TOKEN)?,
            self.get(KEY_EXPIRES_IN)?,
            self.get(KEY_ISSUED_AT)?,
        ))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        for key in [KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_EXPIRES_IN, KEY_ISSUED_AT] {
            self.delete(key)?;
        }

        debug!(service = %self.service_name, "session record cleared from keychain");
        Ok(())
    }
}

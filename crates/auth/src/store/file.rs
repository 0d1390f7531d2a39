//! Plain-file session store.
//!
//! The always-available, less-secure backend: the four entries live as a
//! JSON object of strings in a single file. Used where no platform
//! credential store exists; the keychain backend is preferred everywhere
//! else.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{
    record_from_entries, KEY_ACCESS_TOKEN, KEY_EXPIRES_IN, KEY_ISSUED_AT, KEY_REFRESH_TOKEN,
};
use crate::error::StorageError;
use crate::traits::SessionStoreTrait;
use crate::types::TokenRecord;

/// Session store backed by a single JSON file of string entries.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a store around the given file path. The file and its parent
    /// directory are created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SessionStoreTrait for FileSessionStore {
    async fn save(&self, record: &TokenRecord) -> Result<(), StorageError> {
        let mut entries = BTreeMap::new();
        entries.insert(KEY_ACCESS_TOKEN, record.access_token.clone());
        if let Some(refresh_token) = &record.refresh_token {
            entries.insert(KEY_REFRESH_TOKEN, refresh_token.clone());
        }
        entries.insert(KEY_EXPIRES_IN, record.expires_in.to_string());
        entries.insert(KEY_ISSUED_AT, record.issued_at.to_string());

        let payload = serde_json::to_string_pretty(&entries)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, payload)?;

        // Owner-only: the file holds bearer credentials.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(&self.path)?.permissions();
            permissions.set_mode(0o600);
            fs::set_permissions(&self.path, permissions)?;
        }

        debug!(path = %self.path.display(), "session record written");
        Ok(())
    }

    async fn load(&self) -> Result<Option<TokenRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        let Ok(mut entries) = serde_json::from_str::<BTreeMap<String, String>>(&raw) else {
            debug!(path = %self.path.display(), "session file did not parse; treating as absent");
            return Ok(None);
        };

        Ok(record_from_entries(
            entries.remove(KEY_ACCESS_TOKEN),
            entries.remove(KEY_REFRESH_TOKEN),
            entries.remove(KEY_EXPIRES_IN),
            entries.remove(KEY_ISSUED_AT),
        ))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            debug!(path = %self.path.display(), "session record cleared");
        }
        Ok(())
    }
}

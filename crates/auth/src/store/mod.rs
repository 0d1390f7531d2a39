//! Durable persistence of the session's token record.
//!
//! Both backends persist the same four string-keyed entries
//! (`accessToken`, `refreshToken`, `expiresIn`, `issuedAt`), with the two
//! integers stored as strings. The keychain backend keeps them in the
//! platform credential store; the file backend keeps them in a plain JSON
//! file for targets without one. Which backend a process uses is a pure
//! function of the platform, decided once at startup via
//! [`platform_store`].

mod file;
mod keychain;

use std::path::Path;
use std::sync::Arc;

pub use file::FileSessionStore;
pub use keychain::KeychainSessionStore;

use crate::traits::SessionStoreTrait;
use crate::types::TokenRecord;

pub(crate) const KEY_ACCESS_TOKEN: &str = "accessToken";
pub(crate) const KEY_REFRESH_TOKEN: &str = "refreshToken";
pub(crate) const KEY_EXPIRES_IN: &str = "expiresIn";
pub(crate) const KEY_ISSUED_AT: &str = "issuedAt";

/// Select the storage backend for the current platform.
///
/// Platforms with a credential store get the keychain backend; everything
/// else falls back to a session file under `data_dir`.
#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
#[must_use]
pub fn platform_store(service_name: &str, _data_dir: &Path) -> Arc<dyn SessionStoreTrait> {
    Arc::new(KeychainSessionStore::new(service_name))
}

/// Select the storage backend for the current platform.
///
/// Platforms with a credential store get the keychain backend; everything
/// else falls back to a session file under `data_dir`.
#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
#[must_use]
pub fn platform_store(_service_name: &str, data_dir: &Path) -> Arc<dyn SessionStoreTrait> {
    Arc::new(FileSessionStore::new(data_dir.join("session.json")))
}

/// Assemble a record from the four raw entries.
///
/// Enforces the all-or-nothing shape: every entry must be present and
/// non-empty, the integers must parse cleanly, and the lifetime must be
/// positive. Anything else is no session.
pub(crate) fn record_from_entries(
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    issued_at: Option<String>,
) -> Option<TokenRecord> {
    let access_token = access_token.filter(|value| !value.is_empty())?;
    let refresh_token = refresh_token.filter(|value| !value.is_empty())?;
    let expires_in: i64 = expires_in?.parse().ok()?;
    let issued_at: i64 = issued_at?.parse().ok()?;

    if expires_in <= 0 || issued_at <= 0 {
        return None;
    }

    Some(TokenRecord { access_token, refresh_token: Some(refresh_token), issued_at, expires_in })
}

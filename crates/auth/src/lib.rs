//! Token lifecycle core for an Azure AD B2C sign-in flow.
//!
//! This crate owns the part of a sign-in screen that has real state: the
//! OAuth2 authorization-code + PKCE token lifecycle. It tracks the path
//! from authorization request through redirect, code exchange, persistence,
//! startup expiry evaluation, conditional refresh, and logout with
//! best-effort revocation, across two interchangeable storage backends.
//! The UI, navigation, and the browser redirect mechanics live with the
//! host application.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ SessionController  │  Lifecycle state machine + read model
//! └─────────┬──────────┘
//!           │
//!           ├──► AuthClient            (authorize URL, code exchange,
//!           │                           refresh, best-effort revoke)
//!           │
//!           └──► SessionStoreTrait     (four string-keyed entries)
//!                     │
//!                     ├──► KeychainSessionStore  (platform credential store)
//!                     └──► FileSessionStore      (plain JSON file)
//! ```
//!
//! The controller is constructed once at process start with its
//! collaborators injected, and is the only component that writes session
//! state. Data flows one way on startup (store → controller → UI) and one
//! way on login (client → controller → store).
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use florence_auth::{
//!     AuthClient, AuthConfig, PromptOutcome, ProviderMetadata, SessionController,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new(
//!         "4b0db8f3-...".to_string(),
//!         vec!["openid".to_string(), "offline_access".to_string()],
//!         "florence".to_string(),
//!         3600,
//!     );
//!     let provider = ProviderMetadata::azure_b2c("contoso", "B2C_1_signin");
//!
//!     let store = florence_auth::platform_store("Florence.auth", std::path::Path::new("."));
//!     let controller =
//!         SessionController::new(AuthClient::new(config, provider), Arc::clone(&store), 3600);
//!
//!     // Reconcile with whatever the last run left behind.
//!     let snapshot = controller.initialize().await;
//!     println!("signed in: {}", snapshot.is_authenticated);
//!
//!     // Sign in: open the URL externally, then feed the redirect back.
//!     let request = controller.begin_login().await;
//!     println!("open in browser: {}", request.url);
//!     let snapshot = controller
//!         .complete_login(PromptOutcome::Success {
//!             code: "code-from-redirect".to_string(),
//!             state: request.state,
//!         })
//!         .await?;
//!     println!("expires in {} seconds", snapshot.expires_in);
//!
//!     controller.logout().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod pkce;
pub mod store;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export the types a host application touches.
pub use client::AuthClient;
pub use config::{AuthConfig, ProviderMetadata};
pub use controller::SessionController;
pub use error::{DiscoveryError, ExchangeError, RefreshError, SessionError, StorageError};
pub use pkce::PkceChallenge;
pub use store::{platform_store, FileSessionStore, KeychainSessionStore};
pub use traits::{AuthClientTrait, SessionStoreTrait};
pub use types::{
    AuthorizationRequest, PromptOutcome, SessionPhase, SessionSnapshot, TokenRecord, TokenResponse,
};

//! PKCE (RFC 7636) challenge material for the authorization request.
//!
//! The sign-in flow runs without a client secret, so the proof key is the
//! only thing binding the authorization code to this process: the verifier
//! stays local until the code exchange, the S256 challenge travels with the
//! authorization request, and the state token guards the redirect against
//! CSRF.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// One-shot PKCE material for a single authorization request.
///
/// Generated when the request is built, consumed by the code exchange.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Random verifier (43 chars base64url, within the RFC 7636 43-128
    /// window). Kept secret until the token exchange.
    pub code_verifier: String,

    /// `BASE64URL(SHA256(code_verifier))`, sent with the authorization
    /// request for server-side validation.
    pub code_challenge: String,

    /// Random CSRF token; must round-trip through the redirect unchanged.
    pub state: String,
}

impl PkceChallenge {
    /// Generate fresh challenge material from the thread-local CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = random_token();
        let code_challenge = derive_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state: random_token() }
    }

    /// Challenge method advertised to the provider (always `S256`).
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

/// 32 random bytes, base64url-encoded without padding (43 characters).
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn derive_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

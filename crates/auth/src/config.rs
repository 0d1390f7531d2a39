//! Configuration and provider metadata.
//!
//! [`AuthConfig`] is everything the sign-in flow needs to know about this
//! application; [`ProviderMetadata`] is the endpoint triple describing the
//! authorization server. The metadata is either assembled statically from an
//! Azure AD B2C `{domain, policy}` pair or fetched once from an issuer's
//! OpenID Connect discovery document; two ways of obtaining the same thing.
//!
//! Both are constructed explicitly at process start and injected; nothing in
//! this crate reads ambient configuration.

use serde::Deserialize;
use tracing::debug;

use crate::error::DiscoveryError;

/// Application-side OAuth configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client id registered with the provider.
    pub client_id: String,

    /// Scopes to request. `offline_access` is what makes the provider issue
    /// a refresh token.
    pub scopes: Vec<String>,

    /// Custom URI scheme the provider redirects back to after the prompt.
    pub redirect_scheme: String,

    /// Refresh the access token when it has at most this many seconds of
    /// validity left (evaluated during startup reconciliation).
    pub refresh_threshold: i64,
}

impl AuthConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(
        client_id: String,
        scopes: Vec<String>,
        redirect_scheme: String,
        refresh_threshold: i64,
    ) -> Self {
        Self { client_id, scopes, redirect_scheme, refresh_threshold }
    }

    /// Redirect URI derived from the configured scheme.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}://auth", self.redirect_scheme)
    }

    /// Scopes as the space-separated string the wire format wants.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Authorization server endpoint triple, plus the optional revocation
/// endpoint some providers advertise.
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub end_session_endpoint: String,
    /// Advertised by discovery for providers that support RFC 7009; absent
    /// on Azure AD B2C policy endpoints.
    pub revocation_endpoint: Option<String>,
}

impl ProviderMetadata {
    /// Assemble metadata from explicit endpoint URLs.
    #[must_use]
    pub fn new(
        authorization_endpoint: String,
        token_endpoint: String,
        end_session_endpoint: String,
    ) -> Self {
        Self {
            authorization_endpoint,
            token_endpoint,
            end_session_endpoint,
            revocation_endpoint: None,
        }
    }

    /// Set the revocation endpoint.
    #[must_use]
    pub fn with_revocation_endpoint(mut self, url: String) -> Self {
        self.revocation_endpoint = Some(url);
        self
    }

    /// Statically assemble the Azure AD B2C endpoint triple for a tenant
    /// domain and user-flow policy.
    ///
    /// B2C endpoints are specific to the user flow ("policy") an application
    /// authenticates with, which is why the policy name is part of every
    /// URL.
    #[must_use]
    pub fn azure_b2c(domain: &str, policy: &str) -> Self {
        let base = format!("https://{domain}.b2clogin.com/{domain}.onmicrosoft.com/{policy}/oauth2/v2.0");
        Self {
            authorization_endpoint: format!("{base}/authorize"),
            token_endpoint: format!("{base}/token"),
            end_session_endpoint: format!("{base}/logout"),
            revocation_endpoint: None,
        }
    }

    /// Fetch metadata from the issuer's OpenID Connect discovery document.
    ///
    /// One awaited round-trip to `{issuer}/.well-known/openid-configuration`.
    ///
    /// # Errors
    /// Returns [`DiscoveryError`] if the document cannot be fetched, parsed,
    /// or omits a required endpoint.
    pub async fn discover(issuer: &str, http: &reqwest::Client) -> Result<Self, DiscoveryError> {
        let url = format!("{}/.well-known/openid-configuration", issuer.trim_end_matches('/'));
        debug!(url = %url, "fetching discovery document");

        let response = http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Status(response.status()));
        }

        let document: DiscoveryDocument =
            response.json().await.map_err(|e| DiscoveryError::Parse(e.to_string()))?;

        Ok(Self {
            authorization_endpoint: document.authorization_endpoint,
            token_endpoint: document.token_endpoint,
            end_session_endpoint: document
                .end_session_endpoint
                .ok_or(DiscoveryError::MissingEndpoint("end_session"))?,
            revocation_endpoint: document.revocation_endpoint,
        })
    }
}

/// The subset of the OpenID Connect discovery document this crate reads.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    authorization_endpoint: String,
    token_endpoint: String,
    #[serde(default)]
    end_session_endpoint: Option<String>,
    #[serde(default)]
    revocation_endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration and static metadata assembly.
    use super::*;

    /// Validates `AuthConfig` derived values.
    ///
    /// Assertions:
    /// - Confirms the redirect URI is derived from the scheme.
    /// - Confirms scopes join into a space-separated string.
    #[test]
    fn config_derived_values() {
        let config = AuthConfig::new(
            "client-123".to_string(),
            vec!["openid".to_string(), "offline_access".to_string()],
            "florence".to_string(),
            3_600,
        );

        assert_eq!(config.redirect_uri(), "florence://auth");
        assert_eq!(config.scope_string(), "openid offline_access");
        assert_eq!(config.refresh_threshold, 3_600);
    }

    /// Validates `ProviderMetadata::azure_b2c` endpoint assembly.
    ///
    /// Assertions:
    /// - Confirms all three endpoints carry the tenant domain and policy.
    /// - Ensures no revocation endpoint is advertised.
    #[test]
    fn azure_b2c_endpoints() {
        let metadata = ProviderMetadata::azure_b2c("contoso", "B2C_1_signin");

        assert_eq!(
            metadata.authorization_endpoint,
            "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signin/oauth2/v2.0/authorize"
        );
        assert_eq!(
            metadata.token_endpoint,
            "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signin/oauth2/v2.0/token"
        );
        assert_eq!(
            metadata.end_session_endpoint,
            "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signin/oauth2/v2.0/logout"
        );
        assert!(metadata.revocation_endpoint.is_none());
    }

    /// Validates the revocation endpoint builder.
    #[test]
    fn revocation_endpoint_builder() {
        let metadata = ProviderMetadata::new(
            "https://idp.example/authorize".to_string(),
            "https://idp.example/token".to_string(),
            "https://idp.example/logout".to_string(),
        )
        .with_revocation_endpoint("https://idp.example/revoke".to_string());

        assert_eq!(metadata.revocation_endpoint.as_deref(), Some("https://idp.example/revoke"));
    }
}

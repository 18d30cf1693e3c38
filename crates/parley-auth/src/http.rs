//! HTTP token provider backed by `reqwest`.
//!
//! Talks to the dashboard backend's token endpoint:
//!
//! ```text
//! GET {base_url}/token?identity={identity}
//!   → 200 {"token": "<credential>"}
//! ```

use std::time::Duration;

use parley_protocol::{Credential, Identity};
use serde::Deserialize;

use crate::{TokenError, TokenProvider};

/// Base URL used when none is configured.
///
/// The endpoint is then `/token` on the local origin.
pub const LOCAL_ORIGIN: &str = "http://localhost";

/// Identity used when none is configured and the caller supplies a blank one.
pub const DEFAULT_IDENTITY: &str = "guest";

/// Body of a successful token response. Extra fields are ignored.
#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Fetches credentials from the backend's `/token` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenProvider {
    http: reqwest::Client,
    endpoint: String,
    default_identity: Identity,
}

impl HttpTokenProvider {
    /// Creates a builder with no base URL, no timeout, and the
    /// [`DEFAULT_IDENTITY`] fallback.
    pub fn builder() -> HttpTokenProviderBuilder {
        HttpTokenProviderBuilder::new()
    }

    /// The full URL requests are sent to, without the query string.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The identity substituted for blank identities.
    pub fn default_identity(&self) -> &Identity {
        &self.default_identity
    }
}

impl TokenProvider for HttpTokenProvider {
    async fn fetch_token(
        &self,
        identity: &Identity,
    ) -> Result<Credential, TokenError> {
        let identity = identity.clone().or_default_to(&self.default_identity);
        tracing::debug!(%identity, endpoint = %self.endpoint, "requesting token");

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[("identity", identity.as_str())])
            .send()
            .await
            .map_err(|e| TokenError::Unreachable(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TokenError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(%identity, status = status.as_u16(), "token request rejected");
            return Err(TokenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TokenError::InvalidResponse(e.to_string()))?;

        tracing::debug!(%identity, "token issued");
        Ok(Credential::new(parsed.token))
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`HttpTokenProvider`].
#[derive(Debug, Clone)]
pub struct HttpTokenProviderBuilder {
    base_url: Option<String>,
    default_identity: Identity,
    timeout: Option<Duration>,
}

impl HttpTokenProviderBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_identity: Identity::from(DEFAULT_IDENTITY),
            timeout: None,
        }
    }

    /// Sets the backend base URL. `None` means [`LOCAL_ORIGIN`].
    pub fn base_url(mut self, base_url: Option<&str>) -> Self {
        self.base_url = base_url.map(str::to_string);
        self
    }

    /// Sets the identity used when a caller passes a blank one.
    pub fn default_identity(mut self, identity: Identity) -> Self {
        self.default_identity = identity;
        self
    }

    /// Bounds each token request. Unset means requests may wait forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    ///
    /// # Errors
    /// Returns [`TokenError::Setup`] if the HTTP client can't be built
    /// (e.g., the TLS backend fails to initialize).
    pub fn build(self) -> Result<HttpTokenProvider, TokenError> {
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build().map_err(|e| TokenError::Setup(e.to_string()))?;

        let base = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(LOCAL_ORIGIN);
        let endpoint = format!("{}/token", base.trim_end_matches('/'));

        Ok(HttpTokenProvider {
            http,
            endpoint,
            default_identity: self.default_identity,
        })
    }
}

impl Default for HttpTokenProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

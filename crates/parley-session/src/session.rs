//! Session types: configuration and the observable lifecycle state.

use std::time::Duration;

use parley_auth::{DEFAULT_IDENTITY, HttpTokenProvider, TokenError};
use parley_protocol::Identity;

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for a session context.
///
/// Passed explicitly to [`SessionContext::new`](crate::SessionContext::new);
/// nothing is read from the environment here.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the token backend. `None` means the local origin.
    pub base_url: Option<String>,

    /// Identity used when a caller doesn't supply one.
    ///
    /// Default: `"guest"`.
    pub default_identity: Identity,

    /// Upper bound on each token request. `None` (the default) lets a hung
    /// backend block initialization indefinitely.
    pub token_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_identity: Identity::from(DEFAULT_IDENTITY),
            token_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Sets the token backend base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the fallback identity.
    pub fn with_default_identity(mut self, identity: impl Into<Identity>) -> Self {
        self.default_identity = identity.into();
        self
    }

    /// Sets the token request timeout.
    pub fn with_token_timeout(mut self, timeout: Duration) -> Self {
        self.token_timeout = Some(timeout);
        self
    }

    /// Builds the HTTP token provider this configuration describes.
    ///
    /// # Errors
    /// Returns [`TokenError::Setup`] if the HTTP client can't be built.
    pub fn token_provider(&self) -> Result<HttpTokenProvider, TokenError> {
        HttpTokenProvider::builder()
            .base_url(self.base_url.as_deref())
            .default_identity(self.default_identity.clone())
            .timeout(self.token_timeout)
            .build()
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The current state of a session.
///
/// ```text
///   Uninitialized ──init──→ Initializing ──ok──→ Ready
///                               │  ↑               │
///                             error └────init──────┘
///                               ↓  │
///                             Failed
/// ```
///
/// The connection handle itself is never part of the state: consumers
/// observe where the session is, and reach the platform only through the
/// session's accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No initialization has been requested yet, or the context was torn
    /// down.
    Uninitialized,

    /// Credential fetch and connection setup are in flight.
    Initializing { identity: Identity },

    /// A live connection for `identity` is available.
    Ready { identity: Identity },

    /// The last initialization failed.
    Failed(SessionError),
}

impl SessionState {
    /// Returns `true` if a live connection is available.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// The identity being initialized or served, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Initializing { identity } | Self::Ready { identity } => {
                Some(identity)
            }
            Self::Uninitialized | Self::Failed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_guest_and_no_timeout() {
        let config = SessionConfig::default();

        assert_eq!(config.default_identity, Identity::from("guest"));
        assert!(config.base_url.is_none());
        assert!(config.token_timeout.is_none());
    }

    #[test]
    fn test_token_provider_follows_config() {
        let config = SessionConfig::default()
            .with_base_url("https://backend.example.com")
            .with_default_identity("front-desk")
            .with_token_timeout(Duration::from_secs(5));

        let provider = config.token_provider().unwrap();

        assert_eq!(provider.endpoint(), "https://backend.example.com/token");
        assert_eq!(provider.default_identity().as_str(), "front-desk");
    }

    #[test]
    fn test_state_identity_and_readiness() {
        let alice = Identity::from("alice");

        let ready = SessionState::Ready {
            identity: alice.clone(),
        };
        assert!(ready.is_ready());
        assert_eq!(ready.identity(), Some(&alice));

        let initializing = SessionState::Initializing {
            identity: alice.clone(),
        };
        assert!(!initializing.is_ready());
        assert_eq!(initializing.identity(), Some(&alice));

        assert_eq!(SessionState::Uninitialized.identity(), None);
        assert_eq!(
            SessionState::Failed(SessionError::Uninitialized).identity(),
            None
        );
    }
}

//! Error types for the session layer.

use parley_auth::TokenError;
use parley_client::ClientError;
use parley_protocol::Identity;

/// Errors that can occur during session management.
///
/// These cover the full lifecycle of a session: credential acquisition,
/// connection setup, operations against the live connection, and
/// teardown. Every variant is `Clone` because one initialization attempt
/// can have several callers waiting on it, and each of them gets the
/// outcome.
///
/// Failures split into two groups (see [`is_retryable`](Self::is_retryable)):
/// transient, auth-shaped ones that the manager retries once after
/// re-initializing, and structural ones that are surfaced immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The token backend was unreachable or answered with a non-2xx
    /// status (`status` is `None` when there was no response at all).
    #[error("token fetch failed{}: {body}", status_suffix(.status))]
    TokenFetch { status: Option<u16>, body: String },

    /// The backend or platform answered, but with a payload that breaks
    /// its contract.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The messaging platform SDK is missing or broken.
    #[error("messaging SDK unavailable: {0}")]
    SdkUnavailable(String),

    /// The platform rejected the credential, typically because it expired.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A platform request failed in transit.
    #[error("platform request failed: {0}")]
    Platform(String),

    /// Local setup failed before any request was made, for example an
    /// HTTP client that could not be built.
    #[error("session setup failed: {0}")]
    Setup(String),

    /// A session operation was attempted before a successful
    /// initialization.
    #[error("session is not initialized")]
    Uninitialized,

    /// A newer initialization took over before this one finished. Its
    /// result was discarded.
    #[error("initialization for {identity} was superseded")]
    Superseded { identity: Identity },

    /// The owning context was torn down.
    #[error("session closed")]
    Closed,
}

impl SessionError {
    /// Returns `true` for failures worth one re-initialization and retry:
    /// unreachable/rejecting token backend, rejected credentials, and
    /// transient platform request failures.
    ///
    /// Malformed responses, a missing SDK, local setup failures and usage
    /// errors are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TokenFetch { .. } | Self::Auth(_) | Self::Platform(_)
        )
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Unreachable(body) => Self::TokenFetch { status: None, body },
            TokenError::Setup(msg) => Self::Setup(msg),
            TokenError::Status { status, body } => Self::TokenFetch {
                status: Some(status),
                body,
            },
            TokenError::InvalidResponse(msg) => Self::InvalidResponse(msg),
        }
    }
}

impl From<ClientError> for SessionError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::SdkUnavailable(msg) => Self::SdkUnavailable(msg),
            ClientError::Auth(msg) => Self::Auth(msg),
            ClientError::Request(msg) => Self::Platform(msg),
            ClientError::InvalidResponse(msg) => Self::InvalidResponse(msg),
            ClientError::Closed => Self::Platform(err.to_string()),
        }
    }
}

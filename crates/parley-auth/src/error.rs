//! Error types for credential acquisition.

/// Errors that can occur while fetching a credential from the backend.
///
/// None of these are retried here. Whether a failure is worth another
/// attempt is decided by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The request never produced a response: connection refused, DNS
    /// failure, an unusable URL, or the body couldn't be read.
    #[error("token endpoint unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with a non-2xx status.
    ///
    /// The body is kept verbatim so the dashboard can show what the
    /// backend said.
    #[error("token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered 2xx but the payload wasn't a JSON object with
    /// a string `token` field.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// The HTTP client itself couldn't be constructed.
    #[error("token client setup failed: {0}")]
    Setup(String),
}

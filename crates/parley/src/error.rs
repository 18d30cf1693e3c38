//! Unified error type for Parley.

use parley_auth::TokenError;
use parley_client::ClientError;
use parley_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `parley` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// A token backend error (unreachable, non-2xx, malformed body).
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A messaging platform error (SDK missing, credential rejected).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A session error (uninitialized, superseded, closed, or a
    /// surfaced failure from the layers below).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

//! The credential source seam.
//!
//! Parley doesn't issue credentials. A backend service does, and the
//! session manager only needs "give me a token for this identity". The
//! [`TokenProvider`] trait is that single question, so production code can
//! talk HTTP ([`HttpTokenProvider`](crate::HttpTokenProvider)) while tests
//! and demos hand out tokens from memory.

use std::future::Future;
use std::sync::Arc;

use parley_protocol::{Credential, Identity};

use crate::TokenError;

/// Issues short-lived credentials for identities.
///
/// # Trait bounds
///
/// - `Send + Sync` → a provider is shared by every task that initializes
///   the session.
/// - `'static` → it lives as long as the session manager that owns it.
///
/// # Example
///
/// ```rust
/// use parley_auth::{TokenError, TokenProvider};
/// use parley_protocol::{Credential, Identity};
///
/// /// Hands every identity the same token. Development only.
/// struct FixedTokens(&'static str);
///
/// impl TokenProvider for FixedTokens {
///     async fn fetch_token(
///         &self,
///         _identity: &Identity,
///     ) -> Result<Credential, TokenError> {
///         Ok(Credential::new(self.0))
///     }
/// }
/// ```
pub trait TokenProvider: Send + Sync + 'static {
    /// Requests one credential for `identity`.
    ///
    /// Implementations perform a single attempt and never retry.
    fn fetch_token(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Credential, TokenError>> + Send;
}

impl<P: TokenProvider> TokenProvider for Arc<P> {
    fn fetch_token(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Credential, TokenError>> + Send {
        (**self).fetch_token(identity)
    }
}

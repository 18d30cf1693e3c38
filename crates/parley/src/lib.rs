//! # Parley
//!
//! Real-time conversation sessions for the business dashboard.
//!
//! Parley authenticates a user identity against the dashboard backend,
//! opens a connection to the hosted messaging platform, keeps it alive
//! across credential expiry, and exposes the user's conversations and
//! message histories as lazy streams.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures_util::TryStreamExt;
//! use parley::prelude::*;
//!
//! # async fn run<F: ClientFactory>(platform: F) -> Result<(), ParleyError> {
//! parley::logging::init("info");
//! let config = parley::config::from_env()?;
//!
//! let ctx = SessionContext::with_http(config, platform)?;
//! ctx.connect(None).await?;
//!
//! let inbox: Vec<Conversation> = ctx.conversations().try_collect().await?;
//! for conversation in &inbox {
//!     println!("{}", conversation.id);
//! }
//! ctx.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use error::ParleyError;

// Re-export sub-crates for advanced usage.
pub use parley_auth as auth;
pub use parley_client as client;
pub use parley_protocol as protocol;
pub use parley_session as session;

/// Convenience re-exports for common usage.
///
/// ```rust
/// use parley::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::ParleyError;

    pub use parley_auth::{HttpTokenProvider, TokenProvider};
    pub use parley_client::{ClientFactory, Connection, LazyFactory, SdkLoader};
    pub use parley_protocol::{
        Conversation, ConversationId, Credential, Identity, Message, Page,
    };
    pub use parley_session::{
        SessionConfig, SessionContext, SessionError, SessionManager, SessionState,
    };
}

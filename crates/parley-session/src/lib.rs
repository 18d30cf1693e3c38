//! Session management for Parley.
//!
//! This crate turns two injected capabilities, a token provider and a
//! platform client factory, into a managed conversation session:
//!
//! 1. **Lifecycle**: credential fetch, connect, and teardown of one live
//!    connection ([`SessionManager`])
//! 2. **Recovery**: a failed platform call is retried exactly once after
//!    re-initializing, which renews an expired credential
//! 3. **Paging**: conversation lists and message histories as lazy streams
//!    ([`PaginatedFetcher`])
//! 4. **Scoping**: a consumer-owned [`SessionContext`] that creates the
//!    manager on first use and tears it down on drop
//!
//! # How it fits in the stack
//!
//! ```text
//! Consumer (dashboard views)   ← reads state, streams conversations
//!     ↕
//! Session Layer (this crate)   ← owns the connection and its lifecycle
//!     ↕
//! parley-auth / parley-client  ← token backend and messaging platform
//! ```

mod context;
mod error;
mod manager;
mod paginate;
mod session;

pub use context::SessionContext;
pub use error::SessionError;
pub use manager::SessionManager;
pub use paginate::{ConversationPages, MessagePages, PageSource, PaginatedFetcher};
pub use session::{SessionConfig, SessionState};

//! Messaging-platform client abstraction for Parley.
//!
//! Provides the [`ClientFactory`] and [`Connection`] traits that stand in
//! for the hosted real-time messaging platform's SDK. The session layer
//! depends on exactly four platform capabilities, and these traits are
//! all of them:
//!
//! 1. build a connection from a credential ([`ClientFactory::connect`])
//! 2. list the identity's subscribed conversations, one page at a time
//! 3. list a conversation's messages, one page at a time
//! 4. shut a connection down gracefully
//!
//! # Feature Flags
//!
//! - `memory`: [`MemoryPlatform`], an in-process platform used by tests
//!   and the demo console.

mod error;
mod lazy;
#[cfg(feature = "memory")]
mod memory;

pub use error::ClientError;
pub use lazy::{LazyFactory, SdkLoader};
#[cfg(feature = "memory")]
pub use memory::{MemoryConnection, MemoryPlatform};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parley_protocol::{Conversation, ConversationId, Credential, Cursor, Message, Page};

/// Opaque identifier for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Builds connections to the messaging platform.
///
/// Credential validation belongs to the platform: a rejected credential
/// comes back as [`ClientError::Auth`].
pub trait ClientFactory: Send + Sync + 'static {
    /// The connection type produced by this factory.
    type Connection: Connection;

    /// Opens a connection authenticated by `credential`.
    fn connect(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Self::Connection, ClientError>> + Send;
}

impl<F: ClientFactory> ClientFactory for Arc<F> {
    type Connection = F::Connection;

    fn connect(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Self::Connection, ClientError>> + Send {
        (**self).connect(credential)
    }
}

/// A live, authenticated connection to the messaging platform.
pub trait Connection: Send + Sync + 'static {
    /// Fetches one page of the conversations the identity is subscribed to.
    ///
    /// `None` asks for the first page.
    fn list_conversations(
        &self,
        cursor: Option<Cursor>,
    ) -> impl Future<Output = Result<Page<Conversation>, ClientError>> + Send;

    /// Fetches one page of a conversation's message history.
    fn list_messages(
        &self,
        conversation: &ConversationId,
        cursor: Option<Cursor>,
    ) -> impl Future<Output = Result<Page<Message>, ClientError>> + Send;

    /// Closes the connection. Further calls fail with [`ClientError::Closed`].
    fn shutdown(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

//! Core data types shared by every Parley layer.
//!
//! These are the values that flow between the token backend, the hosted
//! messaging platform, the session manager, and the dashboard views that
//! render conversations. None of them carry behavior beyond formatting
//! and construction: conversations and messages are read-only projections
//! of whatever the platform returned for a single fetch.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The logical user a session is established for.
///
/// Opaque to Parley: the backend and the messaging platform agree on what
/// it means. Once a session has been created for an identity, that session
/// never changes identity; switching users means a new initialization.
///
/// `#[serde(transparent)]` serializes `Identity("alice")` as `"alice"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wraps a raw identity string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when no identity was supplied (empty or whitespace).
    ///
    /// Blank identities are replaced by the configured default identity
    /// before any network call is made.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns `self`, or `fallback` when `self` is blank.
    pub fn or_default_to(self, fallback: &Identity) -> Identity {
        if self.is_blank() {
            fallback.clone()
        } else {
            self
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Identity {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A short-lived token that authenticates one connection attempt.
///
/// Credentials are issued per identity by the token backend and handed
/// straight to the platform client factory. They are never persisted, and
/// `Debug` is implemented by hand so a credential can't leak into logs
/// through `{:?}` formatting.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token. Only platform adapters should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Conversations and messages
// ---------------------------------------------------------------------------

/// Platform-assigned identifier of a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Platform-assigned identifier of a single message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A conversation thread the identity is subscribed to.
///
/// `last_activity` is Unix epoch milliseconds, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<Identity>,
    pub last_activity: u64,
}

/// One message inside a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub author: Identity,
    pub body: String,
    /// Unix epoch milliseconds.
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

/// Opaque continuation token returned by the platform alongside a page.
///
/// Parley never inspects a cursor; it only hands it back to fetch the
/// next page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bounded batch of results plus what's needed to fetch the next one.
///
/// Items keep the order the platform returned them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// A final page: no more results follow.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_more: false,
            cursor: None,
        }
    }

    /// A page that continues at `cursor`.
    pub fn more(items: Vec<T>, cursor: Cursor) -> Self {
        Self {
            items,
            has_more: true,
            cursor: Some(cursor),
        }
    }

    /// The cursor to continue from, or `None` if this page ends the walk.
    ///
    /// A page that claims `has_more` but carries no cursor also ends the
    /// walk; there is nothing to continue from.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        if self.has_more {
            self.cursor.as_ref()
        } else {
            None
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

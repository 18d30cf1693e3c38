//! In-process messaging platform.
//!
//! [`MemoryPlatform`] plays both hosted services at once: it issues
//! credentials (it implements [`TokenProvider`]) and accepts connections
//! authenticated by them (it implements [`ClientFactory`]). Credentials
//! can be revoked to simulate expiry mid-session, and request failures can
//! be queued up to exercise the session layer's retry policy.
//!
//! All state sits behind one `std::sync::Mutex`. Every operation is
//! synchronous under the lock, so it's never held across an await.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_auth::{TokenError, TokenProvider};
use parley_protocol::{
    Conversation, ConversationId, Credential, Cursor, Identity, Message,
    MessageId, Page,
};

use crate::{ClientError, ClientFactory, Connection, ConnectionId};

#[derive(Debug)]
struct Grant {
    identity: Identity,
    revoked: bool,
}

#[derive(Debug, Default)]
struct PlatformState {
    conversations: Vec<Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
    grants: HashMap<String, Grant>,
    injected_failures: VecDeque<ClientError>,
    next_token: u64,
    next_message: u64,
    next_connection: u64,
    tokens_issued: usize,
    connects: usize,
}

/// A messaging platform living entirely in memory.
///
/// Cloning is cheap; clones share the same state.
#[derive(Debug, Clone)]
pub struct MemoryPlatform {
    state: Arc<Mutex<PlatformState>>,
    page_size: usize,
}

impl MemoryPlatform {
    /// Creates an empty platform serving pages of at most `page_size`
    /// items (minimum 1).
    pub fn new(page_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlatformState::default())),
            page_size: page_size.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a conversation between `participants`.
    pub fn add_conversation(
        &self,
        id: &str,
        participants: &[&str],
        last_activity: u64,
    ) -> ConversationId {
        let id = ConversationId::from(id);
        let mut state = self.lock();
        state.conversations.push(Conversation {
            id: id.clone(),
            participants: participants.iter().map(|p| Identity::from(*p)).collect(),
            last_activity,
        });
        state.messages.entry(id.clone()).or_default();
        id
    }

    /// Appends a message to a conversation and bumps its last activity.
    ///
    /// Posting to an unknown conversation is ignored and returns `None`.
    pub fn post_message(
        &self,
        conversation: &ConversationId,
        author: &str,
        body: &str,
        timestamp: u64,
    ) -> Option<MessageId> {
        let mut state = self.lock();
        let conv = state
            .conversations
            .iter_mut()
            .find(|c| &c.id == conversation)?;
        conv.last_activity = conv.last_activity.max(timestamp);

        state.next_message += 1;
        let id = MessageId(format!("msg-{}", state.next_message));
        state.messages.entry(conversation.clone()).or_default().push(
            Message {
                id: id.clone(),
                conversation_id: conversation.clone(),
                author: Identity::from(author),
                body: body.to_string(),
                timestamp,
            },
        );
        Some(id)
    }

    /// Issues a fresh credential for `identity`.
    pub fn issue(&self, identity: &Identity) -> Credential {
        let mut state = self.lock();
        state.next_token += 1;
        state.tokens_issued += 1;
        let token = format!("mem-{}-{}", identity, state.next_token);
        state.grants.insert(
            token.clone(),
            Grant {
                identity: identity.clone(),
                revoked: false,
            },
        );
        Credential::new(token)
    }

    /// Revokes every credential issued to `identity`.
    ///
    /// Open connections using those credentials start failing with
    /// [`ClientError::Auth`], as if the token had expired.
    pub fn revoke_all(&self, identity: &Identity) {
        let mut state = self.lock();
        for grant in state.grants.values_mut() {
            if &grant.identity == identity {
                grant.revoked = true;
            }
        }
    }

    /// Makes the next listing requests fail with `errors`, in order.
    pub fn inject_failures(&self, errors: impl IntoIterator<Item = ClientError>) {
        self.lock().injected_failures.extend(errors);
    }

    /// Number of credentials issued so far.
    pub fn tokens_issued(&self) -> usize {
        self.lock().tokens_issued
    }

    /// Number of successful connections so far.
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Checks the credential and pending faults for one listing request.
    fn authorize(&self, token: &str) -> Result<(), ClientError> {
        let mut state = self.lock();
        if let Some(err) = state.injected_failures.pop_front() {
            return Err(err);
        }
        match state.grants.get(token) {
            Some(grant) if !grant.revoked => Ok(()),
            Some(_) => Err(ClientError::Auth("credential expired".into())),
            None => Err(ClientError::Auth("unknown credential".into())),
        }
    }

    fn page<T: Clone>(
        &self,
        all: &[T],
        cursor: Option<Cursor>,
    ) -> Result<Page<T>, ClientError> {
        let start = match cursor {
            None => 0,
            Some(Cursor(raw)) => raw.parse::<usize>().map_err(|_| {
                ClientError::InvalidResponse(format!("unknown cursor {raw:?}"))
            })?,
        };
        let start = start.min(all.len());
        let end = (start + self.page_size).min(all.len());
        let items = all[start..end].to_vec();

        if end < all.len() {
            Ok(Page::more(items, Cursor(end.to_string())))
        } else {
            Ok(Page::last(items))
        }
    }
}

impl TokenProvider for MemoryPlatform {
    async fn fetch_token(
        &self,
        identity: &Identity,
    ) -> Result<Credential, TokenError> {
        Ok(self.issue(identity))
    }
}

impl ClientFactory for MemoryPlatform {
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<MemoryConnection, ClientError> {
        let mut state = self.lock();
        let identity = match state.grants.get(credential.expose()) {
            Some(grant) if !grant.revoked => grant.identity.clone(),
            Some(_) => return Err(ClientError::Auth("credential expired".into())),
            None => return Err(ClientError::Auth("unknown credential".into())),
        };
        state.next_connection += 1;
        state.connects += 1;
        let id = ConnectionId::new(state.next_connection);
        tracing::debug!(%id, %identity, "memory platform accepted connection");

        Ok(MemoryConnection {
            id,
            identity,
            token: credential.expose().to_string(),
            platform: self.clone(),
            closed: AtomicBool::new(false),
        })
    }
}

/// A connection to a [`MemoryPlatform`].
#[derive(Debug)]
pub struct MemoryConnection {
    id: ConnectionId,
    identity: Identity,
    token: String,
    platform: MemoryPlatform,
    closed: AtomicBool,
}

impl MemoryConnection {
    /// The identity this connection was authenticated as.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns `true` once [`Connection::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        self.platform.authorize(&self.token)
    }
}

impl Connection for MemoryConnection {
    async fn list_conversations(
        &self,
        cursor: Option<Cursor>,
    ) -> Result<Page<Conversation>, ClientError> {
        self.check_open()?;
        let mut mine: Vec<Conversation> = self
            .platform
            .lock()
            .conversations
            .iter()
            .filter(|c| c.participants.contains(&self.identity))
            .cloned()
            .collect();
        // Most recently active first; stable for ties.
        mine.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        self.platform.page(&mine, cursor)
    }

    async fn list_messages(
        &self,
        conversation: &ConversationId,
        cursor: Option<Cursor>,
    ) -> Result<Page<Message>, ClientError> {
        self.check_open()?;
        let history = {
            let state = self.platform.lock();
            let member = state
                .conversations
                .iter()
                .any(|c| &c.id == conversation && c.participants.contains(&self.identity));
            if !member {
                return Err(ClientError::Request(format!(
                    "conversation {conversation} not found"
                )));
            }
            state.messages.get(conversation).cloned().unwrap_or_default()
        };
        self.platform.page(&history, cursor)
    }

    async fn shutdown(&self) -> Result<(), ClientError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        tracing::debug!(id = %self.id, identity = %self.identity, "memory connection shut down");
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

//! The consumer-facing session scope.
//!
//! A [`SessionContext`] is what view code holds on to. It owns the
//! configuration and the two injected capabilities (token provider and
//! client factory), creates the [`SessionManager`] on first use, and tears
//! it down when closed or dropped.

use std::sync::{Arc, OnceLock};

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use parley_auth::{HttpTokenProvider, TokenProvider};
use parley_client::ClientFactory;
use parley_protocol::{Conversation, ConversationId, Identity, Message};
use tokio::sync::watch;

use crate::{SessionConfig, SessionError, SessionManager, SessionState};

/// Scopes one session to a consumer.
///
/// # Example
///
/// ```rust,no_run
/// use futures_util::TryStreamExt;
/// use parley_client::MemoryPlatform;
/// use parley_session::{SessionConfig, SessionContext};
///
/// # async fn example() -> Result<(), parley_session::SessionError> {
/// let platform = MemoryPlatform::new(20);
/// let ctx = SessionContext::new(SessionConfig::default(), platform.clone(), platform);
///
/// ctx.connect(Some("alice")).await?;
/// let inbox: Vec<_> = ctx.conversations().try_collect().await?;
/// ctx.close().await;
/// # Ok(())
/// # }
/// ```
pub struct SessionContext<T, F: ClientFactory> {
    config: SessionConfig,
    tokens: Arc<T>,
    factory: Arc<F>,
    manager: OnceLock<SessionManager<Arc<T>, Arc<F>>>,
}

impl<F: ClientFactory> SessionContext<HttpTokenProvider, F> {
    /// Creates a context that fetches credentials from the backend
    /// described by `config`.
    ///
    /// # Errors
    /// Returns [`SessionError::TokenFetch`] if the HTTP client can't be
    /// built.
    pub fn with_http(config: SessionConfig, factory: F) -> Result<Self, SessionError> {
        let tokens = config.token_provider()?;
        Ok(Self::new(config, tokens, factory))
    }
}

impl<T, F> SessionContext<T, F>
where
    T: TokenProvider,
    F: ClientFactory,
{
    /// Creates a context. No session exists until first use.
    pub fn new(config: SessionConfig, tokens: T, factory: F) -> Self {
        Self {
            config,
            tokens: Arc::new(tokens),
            factory: Arc::new(factory),
            manager: OnceLock::new(),
        }
    }

    /// The session manager, created on first access.
    pub fn manager(&self) -> &SessionManager<Arc<T>, Arc<F>> {
        self.manager.get_or_init(|| {
            tracing::debug!("creating session manager");
            SessionManager::new(
                &self.config,
                Arc::clone(&self.tokens),
                Arc::clone(&self.factory),
            )
        })
    }

    /// The identity used when [`connect`](Self::connect) gets none.
    pub fn default_identity(&self) -> &Identity {
        &self.config.default_identity
    }

    /// Initializes the session for `identity`, or for the configured
    /// default identity when `None` or blank.
    pub async fn connect(&self, identity: Option<&str>) -> Result<(), SessionError> {
        let identity = identity
            .map(Identity::from)
            .unwrap_or_else(|| self.config.default_identity.clone());
        self.manager().init(identity).await.map(|_| ())
    }

    /// The current session state.
    pub fn state(&self) -> SessionState {
        match self.manager.get() {
            Some(manager) => manager.state(),
            None => SessionState::Uninitialized,
        }
    }

    /// Subscribes to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.manager().subscribe()
    }

    /// Streams the conversations of the current identity.
    pub fn conversations(&self) -> BoxStream<'static, Result<Conversation, SessionError>> {
        self.manager().conversations().drain_all().boxed()
    }

    /// Streams the message history of `conversation`.
    pub fn messages(
        &self,
        conversation: &ConversationId,
    ) -> BoxStream<'static, Result<Message, SessionError>> {
        self.manager()
            .messages(conversation.clone())
            .drain_all()
            .boxed()
    }

    /// Tears the session down.
    ///
    /// In-flight initializations and streams are abandoned: their late
    /// results are discarded.
    pub async fn close(&self) {
        if let Some(manager) = self.manager.get() {
            manager.close().await;
        }
    }
}

impl<T, F: ClientFactory> Drop for SessionContext<T, F> {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.get() {
            manager.close_detached();
        }
    }
}

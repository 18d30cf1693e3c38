//! The session manager: one identity's connection to the messaging
//! platform, from credential to teardown.
//!
//! Responsibilities:
//! - Fetching a credential and opening a connection (`init`)
//! - Collapsing concurrent initializations for the same identity into one
//! - Shutting down a connection whenever a newer initialization replaces it
//! - Retrying a failed platform operation exactly once, after
//!   re-initializing (`with_retry`)
//! - Discarding results that arrive after teardown
//!
//! # Concurrency note
//!
//! Every initialization gets a generation number. Only an attempt whose
//! generation is still current when it finishes may touch the session;
//! anything older is stale and its connection, if it got one, is shut
//! down. The interior `Mutex` is never held across an await.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parley_auth::TokenProvider;
use parley_client::{ClientError, ClientFactory, Connection};
use parley_protocol::Identity;
use tokio::sync::watch;

use crate::{SessionConfig, SessionError, SessionState};

/// One initialization attempt, shareable between every caller waiting on it.
type Attempt<C> = Shared<BoxFuture<'static, Result<Arc<C>, SessionError>>>;

struct Inflight<C> {
    identity: Identity,
    attempt: Attempt<C>,
}

/// Mutable session bookkeeping. Guarded by `Inner::slot`.
struct Slot<C> {
    /// Bumped by every `init` and by teardown.
    generation: u64,
    /// Identity of the live handle.
    identity: Option<Identity>,
    /// The live connection. `Some` exactly when the state is `Ready`.
    handle: Option<Arc<C>>,
    /// The attempt currently allowed to commit, if one is running.
    inflight: Option<Inflight<C>>,
    closed: bool,
}

struct Inner<T, F: ClientFactory> {
    tokens: T,
    factory: F,
    default_identity: Identity,
    slot: Mutex<Slot<F::Connection>>,
    state: watch::Sender<SessionState>,
}

/// Owns a session's lifecycle and its live connection.
///
/// ## Lifecycle
///
/// ```text
/// init(alice) ──→ [Initializing] ──→ [Ready]
///                       │               │
///                       ▼               ▼ init(bob): old handle shut down
///                   [Failed]      [Initializing] ──→ ...
/// ```
///
/// Cloning is cheap and every clone drives the same session.
pub struct SessionManager<T, F: ClientFactory> {
    inner: Arc<Inner<T, F>>,
}

impl<T, F: ClientFactory> Clone for SessionManager<T, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, F: ClientFactory> SessionManager<T, F> {
    /// Creates an uninitialized manager. No network calls happen until
    /// [`init`](Self::init).
    pub fn new(config: &SessionConfig, tokens: T, factory: F) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self {
            inner: Arc::new(Inner {
                tokens,
                factory,
                default_identity: config.default_identity.clone(),
                slot: Mutex::new(Slot {
                    generation: 0,
                    identity: None,
                    handle: None,
                    inflight: None,
                    closed: false,
                }),
                state,
            }),
        }
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// The identity the live connection belongs to, if the session is
    /// ready.
    pub fn identity(&self) -> Option<Identity> {
        let slot = self.inner.slot();
        slot.handle.as_ref().and(slot.identity.clone())
    }

    /// Returns `true` once the session has been torn down.
    pub fn is_closed(&self) -> bool {
        self.inner.slot().closed
    }

    /// Returns the live connection.
    ///
    /// # Errors
    /// Returns [`SessionError::Uninitialized`] unless the state is `Ready`.
    pub fn get_session(&self) -> Result<Arc<F::Connection>, SessionError> {
        self.inner
            .slot()
            .handle
            .clone()
            .ok_or(SessionError::Uninitialized)
    }

    /// Tears the session down and shuts the live connection down.
    ///
    /// Any initialization still in flight becomes stale: its result is
    /// discarded when it arrives. Further `init` calls fail with
    /// [`SessionError::Closed`]. Closing twice is a no-op.
    pub async fn close(&self) {
        if let Some(conn) = self.inner.mark_closed() {
            shutdown_quietly(conn.as_ref()).await;
        }
    }

    /// Synchronous teardown for use from `Drop`.
    ///
    /// The connection shutdown runs on a spawned task when a Tokio runtime
    /// is available; otherwise the connection is dropped without a
    /// graceful shutdown.
    pub fn close_detached(&self) {
        let Some(conn) = self.inner.mark_closed() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    shutdown_quietly(conn.as_ref()).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    id = %conn.id(),
                    "no runtime available, dropping connection without shutdown"
                );
            }
        }
    }
}

impl<T, F> SessionManager<T, F>
where
    T: TokenProvider,
    F: ClientFactory,
{
    /// Initializes the session for `identity` and returns the new
    /// connection.
    ///
    /// A blank identity is replaced by the configured default. If an
    /// initialization for the same identity is already running, this call
    /// waits for it instead of starting another. Otherwise a new attempt
    /// starts; it first shuts down the current connection (failures are
    /// logged and ignored), then fetches a credential and connects.
    ///
    /// # Errors
    /// - Whatever the token fetch or connect failed with; the state
    ///   becomes `Failed` with the same error.
    /// - [`SessionError::Superseded`] if a later `init` for another
    ///   identity took over first. The state is left to the later attempt.
    /// - [`SessionError::Closed`] if the session was torn down.
    pub async fn init(
        &self,
        identity: impl Into<Identity>,
    ) -> Result<Arc<F::Connection>, SessionError> {
        let identity = identity.into().or_default_to(&self.inner.default_identity);

        let attempt = {
            let mut slot = self.inner.slot();
            if slot.closed {
                return Err(SessionError::Closed);
            }

            match &slot.inflight {
                Some(inflight) if inflight.identity == identity => {
                    tracing::debug!(%identity, "joining in-flight initialization");
                    inflight.attempt.clone()
                }
                _ => {
                    slot.generation += 1;
                    let generation = slot.generation;
                    let outgoing = slot.handle.take();
                    slot.identity = Some(identity.clone());

                    let attempt = Arc::clone(&self.inner)
                        .attempt(identity.clone(), generation, outgoing)
                        .boxed()
                        .shared();
                    // Replacing a superseded attempt drops our clone of it;
                    // callers still awaiting it see `Superseded`.
                    slot.inflight = Some(Inflight {
                        identity: identity.clone(),
                        attempt: attempt.clone(),
                    });

                    tracing::info!(%identity, generation, "initializing session");
                    self.inner.state.send_replace(SessionState::Initializing {
                        identity,
                    });
                    attempt
                }
            }
        };

        attempt.await
    }

    /// Runs `op` against the live connection, retrying once on a
    /// retryable failure.
    ///
    /// On failure, the session is re-initialized for the identity that was
    /// active when `op` first ran, and `op` is issued again against the
    /// new connection. If another caller already renewed the connection
    /// for that identity in the meantime, the renewed connection is used
    /// as-is. The second outcome is final: its error (or the
    /// re-initialization's error) is returned and the first error is
    /// dropped.
    ///
    /// # Errors
    /// - [`SessionError::Uninitialized`] if there's no live connection;
    ///   nothing is retried.
    /// - Non-retryable failures (see [`SessionError::is_retryable`]) are
    ///   returned as-is.
    pub async fn with_retry<R, Op, Fut>(&self, op: Op) -> Result<R, SessionError>
    where
        Op: Fn(Arc<F::Connection>) -> Fut,
        Fut: Future<Output = Result<R, ClientError>>,
    {
        let (identity, handle) = {
            let slot = self.inner.slot();
            match (&slot.identity, &slot.handle) {
                (Some(identity), Some(handle)) => {
                    (identity.clone(), Arc::clone(handle))
                }
                _ => return Err(SessionError::Uninitialized),
            }
        };

        let first = match op(Arc::clone(&handle)).await {
            Ok(value) => return Ok(value),
            Err(e) => SessionError::from(e),
        };
        if !first.is_retryable() {
            return Err(first);
        }

        let handle = match self.inner.renewed_since(&identity, &handle) {
            Some(renewed) => {
                tracing::debug!(%identity, error = %first, "operation failed, retrying on renewed connection");
                renewed
            }
            None => {
                tracing::warn!(%identity, error = %first, "operation failed, re-initializing once");
                self.init(identity.clone()).await?
            }
        };
        op(handle).await.map_err(|e| {
            let err = SessionError::from(e);
            tracing::warn!(%identity, error = %err, "operation failed after retry");
            err
        })
    }
}

impl<T, F: ClientFactory> Inner<T, F> {
    fn slot(&self) -> MutexGuard<'_, Slot<F::Connection>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The live connection for `identity`, if it replaced `used` after
    /// `used` was handed out.
    fn renewed_since(
        &self,
        identity: &Identity,
        used: &Arc<F::Connection>,
    ) -> Option<Arc<F::Connection>> {
        let slot = self.slot();
        match (&slot.identity, &slot.handle) {
            (Some(current), Some(handle))
                if !slot.closed && current == identity && !Arc::ptr_eq(handle, used) =>
            {
                Some(Arc::clone(handle))
            }
            _ => None,
        }
    }

    /// Marks the session closed and hands back the connection to shut
    /// down. `None` if already closed or nothing was connected.
    fn mark_closed(&self) -> Option<Arc<F::Connection>> {
        let (outgoing, abandoned) = {
            let mut slot = self.slot();
            if slot.closed {
                return None;
            }
            slot.closed = true;
            slot.generation += 1;
            slot.identity = None;
            (slot.handle.take(), slot.inflight.take())
        };
        drop(abandoned);

        tracing::info!("session closed");
        self.state.send_replace(SessionState::Uninitialized);
        outgoing
    }
}

impl<T, F> Inner<T, F>
where
    T: TokenProvider,
    F: ClientFactory,
{
    /// Runs one initialization attempt to completion and commits it if it
    /// is still current.
    async fn attempt(
        self: Arc<Self>,
        identity: Identity,
        generation: u64,
        outgoing: Option<Arc<F::Connection>>,
    ) -> Result<Arc<F::Connection>, SessionError> {
        if let Some(old) = outgoing {
            shutdown_quietly(old.as_ref()).await;
        }

        let result = self.connect(&identity).await;
        self.commit(identity, generation, result).await
    }

    async fn connect(
        &self,
        identity: &Identity,
    ) -> Result<Arc<F::Connection>, SessionError> {
        let credential = self.tokens.fetch_token(identity).await?;
        let conn = self.factory.connect(&credential).await?;
        Ok(Arc::new(conn))
    }

    /// Applies an attempt's result, unless a newer `init` or teardown got
    /// there first.
    async fn commit(
        &self,
        identity: Identity,
        generation: u64,
        result: Result<Arc<F::Connection>, SessionError>,
    ) -> Result<Arc<F::Connection>, SessionError> {
        let (stale, finished) = {
            let mut slot = self.slot();
            if slot.closed {
                (Some(SessionError::Closed), None)
            } else if slot.generation != generation {
                (
                    Some(SessionError::Superseded {
                        identity: identity.clone(),
                    }),
                    None,
                )
            } else {
                match &result {
                    Ok(conn) => {
                        slot.handle = Some(Arc::clone(conn));
                        tracing::info!(%identity, id = %conn.id(), generation, "session ready");
                        self.state.send_replace(SessionState::Ready {
                            identity: identity.clone(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(%identity, error = %e, generation, "session initialization failed");
                        self.state.send_replace(SessionState::Failed(e.clone()));
                    }
                }
                (None, slot.inflight.take())
            }
        };
        // Our own entry; released outside the lock.
        drop(finished);

        match stale {
            None => result,
            Some(err) => {
                tracing::debug!(%identity, generation, reason = %err, "discarding stale initialization");
                if let Ok(conn) = result {
                    shutdown_quietly(conn.as_ref()).await;
                }
                Err(err)
            }
        }
    }
}

/// Shuts a connection down, logging and swallowing any failure.
async fn shutdown_quietly<C: Connection>(conn: &C) {
    if let Err(e) = conn.shutdown().await {
        tracing::warn!(id = %conn.id(), error = %e, "connection shutdown failed, ignoring");
    }
}

// =========================================================================
// Tests
// =========================================================================

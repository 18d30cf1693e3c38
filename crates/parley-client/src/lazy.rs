//! Deferred loading of the platform SDK.
//!
//! The platform SDK is a heavy, optional dependency of the dashboard.
//! [`LazyFactory`] holds an [`SdkLoader`] and only invokes it on the first
//! connection attempt. Once loaded, the SDK's factory is kept for the rest
//! of the process.

use std::future::Future;

use parley_protocol::Credential;
use tokio::sync::OnceCell;

use crate::{ClientError, ClientFactory};

/// Resolves the platform SDK into a usable [`ClientFactory`].
pub trait SdkLoader: Send + Sync + 'static {
    /// The factory the SDK provides once loaded.
    type Factory: ClientFactory;

    /// Loads the SDK.
    ///
    /// Fails when the SDK is missing or doesn't expose a way to construct
    /// connections.
    fn load(&self) -> impl Future<Output = Result<Self::Factory, ClientError>> + Send;
}

/// A [`ClientFactory`] that loads its SDK on first use.
///
/// A failed load is not cached; the next `connect` asks the loader again.
/// Every load failure is reported as [`ClientError::SdkUnavailable`].
pub struct LazyFactory<L: SdkLoader> {
    loader: L,
    sdk: OnceCell<L::Factory>,
}

impl<L: SdkLoader> LazyFactory<L> {
    /// Wraps `loader`. Nothing is loaded until the first `connect`.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            sdk: OnceCell::new(),
        }
    }

    /// Returns `true` once the SDK has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.sdk.initialized()
    }

    async fn sdk(&self) -> Result<&L::Factory, ClientError> {
        self.sdk
            .get_or_try_init(|| async {
                tracing::debug!("loading messaging SDK");
                self.loader.load().await.map_err(|e| match e {
                    ClientError::SdkUnavailable(_) => e,
                    other => ClientError::SdkUnavailable(other.to_string()),
                })
            })
            .await
    }
}

impl<L: SdkLoader> ClientFactory for LazyFactory<L> {
    type Connection = <L::Factory as ClientFactory>::Connection;

    async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<Self::Connection, ClientError> {
        let sdk = self.sdk().await?;
        sdk.connect(credential).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parley_protocol::{
        Conversation, ConversationId, Cursor, Message, Page,
    };

    use super::*;
    use crate::{Connection, ConnectionId};

    // -- Helpers ----------------------------------------------------------

    struct NullConnection;

    impl Connection for NullConnection {
        async fn list_conversations(
            &self,
            _cursor: Option<Cursor>,
        ) -> Result<Page<Conversation>, ClientError> {
            Ok(Page::last(vec![]))
        }

        async fn list_messages(
            &self,
            _conversation: &ConversationId,
            _cursor: Option<Cursor>,
        ) -> Result<Page<Message>, ClientError> {
            Ok(Page::last(vec![]))
        }

        async fn shutdown(&self) -> Result<(), ClientError> {
            Ok(())
        }

        fn id(&self) -> ConnectionId {
            ConnectionId::new(1)
        }
    }

    /// Accepts only the credential "good".
    struct CheckingFactory;

    impl ClientFactory for CheckingFactory {
        type Connection = NullConnection;

        async fn connect(
            &self,
            credential: &Credential,
        ) -> Result<NullConnection, ClientError> {
            if credential.expose() == "good" {
                Ok(NullConnection)
            } else {
                Err(ClientError::Auth("bad credential".into()))
            }
        }
    }

    /// Counts loads; fails while `available` is false.
    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        available: bool,
    }

    impl SdkLoader for CountingLoader {
        type Factory = CheckingFactory;

        async fn load(&self) -> Result<CheckingFactory, ClientError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.available {
                Ok(CheckingFactory)
            } else {
                Err(ClientError::Request("module not found".into()))
            }
        }
    }

    fn lazy(available: bool) -> (LazyFactory<CountingLoader>, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let factory = LazyFactory::new(CountingLoader {
            loads: Arc::clone(&loads),
            available,
        });
        (factory, loads)
    }

    // =====================================================================
    // connect()
    // =====================================================================

    #[tokio::test]
    async fn test_connect_does_not_load_before_first_use() {
        let (factory, loads) = lazy(true);

        assert!(!factory.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connect_loads_sdk_once() {
        let (factory, loads) = lazy(true);

        factory.connect(&Credential::new("good")).await.unwrap();
        factory.connect(&Credential::new("good")).await.unwrap();

        assert!(factory.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_load_failure_is_sdk_unavailable() {
        let (factory, loads) = lazy(false);

        let result = factory.connect(&Credential::new("good")).await;

        assert!(
            matches!(result, Err(ClientError::SdkUnavailable(ref m)) if m.contains("module not found")),
            "got {:?}",
            result.err()
        );
        assert!(!factory.is_loaded());

        // Failures aren't cached.
        let _ = factory.connect(&Credential::new("good")).await;
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connect_rejected_credential_is_auth_error() {
        let (factory, _) = lazy(true);

        let result = factory.connect(&Credential::new("stale")).await;

        assert!(matches!(result, Err(ClientError::Auth(_))));
    }
}

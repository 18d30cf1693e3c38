//! Cursor-based paging over the platform's list APIs.
//!
//! Conversation lists and message histories are both served a page at a
//! time. [`PageSource`] is the one thing that differs between them: how a
//! single page is fetched. [`PaginatedFetcher`] owns the walking
//! algorithm and turns any source into a lazy stream of items.

use std::future::Future;

use futures_util::Stream;
use parley_auth::TokenProvider;
use parley_client::{ClientFactory, Connection};
use parley_protocol::{Conversation, ConversationId, Cursor, Message, Page};

use crate::{SessionError, SessionManager};

/// Fetches one page of results at a given cursor.
pub trait PageSource: Send + Sync + 'static {
    /// What each page contains.
    type Item: Send + 'static;

    /// Fetches the page at `cursor`, or the first page when `None`.
    fn fetch(
        &self,
        cursor: Option<Cursor>,
    ) -> impl Future<Output = Result<Page<Self::Item>, SessionError>> + Send;

    /// Returns `true` once nobody is interested in further results.
    ///
    /// A stale source stops a walk quietly, and a page or error that
    /// arrives after the source went stale is discarded.
    fn is_stale(&self) -> bool {
        false
    }
}

/// Where a walk resumes.
enum Next {
    Start,
    At(Cursor),
    Done,
}

struct Walk<S: PageSource> {
    source: S,
    /// The items of the current page not yet yielded.
    buffer: std::vec::IntoIter<S::Item>,
    next: Next,
}

/// Walks the pages of a [`PageSource`].
pub struct PaginatedFetcher<S> {
    source: S,
}

impl<S: PageSource> PaginatedFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetches a single page.
    pub async fn fetch_page(
        &self,
        cursor: Option<Cursor>,
    ) -> Result<Page<S::Item>, SessionError> {
        self.source.fetch(cursor).await
    }

    /// Streams every item of every page, in order.
    ///
    /// Nothing is fetched until the stream is polled, and the next page is
    /// only requested once the current one has been fully yielded, so at
    /// most one page is held at a time. The stream ends after the last
    /// page, after the first error (which it yields), or when the source
    /// goes stale. It can't be restarted.
    pub fn drain_all(self) -> impl Stream<Item = Result<S::Item, SessionError>> + Send {
        let walk = Walk {
            source: self.source,
            buffer: Vec::new().into_iter(),
            next: Next::Start,
        };

        futures_util::stream::try_unfold(walk, Walk::advance)
    }
}

impl<S: PageSource> Walk<S> {
    /// Yields the next item, fetching the next page when the current one
    /// is used up.
    async fn advance(mut self) -> Result<Option<(S::Item, Self)>, SessionError> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Ok(Some((item, self)));
            }

            let cursor = match std::mem::replace(&mut self.next, Next::Done) {
                Next::Start => None,
                Next::At(cursor) => Some(cursor),
                Next::Done => return Ok(None),
            };
            if self.source.is_stale() {
                tracing::debug!("page source is stale, ending walk");
                return Ok(None);
            }

            tracing::debug!(cursor = ?cursor, "fetching page");
            let result = self.source.fetch(cursor).await;
            if self.source.is_stale() {
                tracing::debug!("discarding page that arrived after teardown");
                return Ok(None);
            }
            let page = result?;

            self.next = match page.next_cursor() {
                Some(cursor) => Next::At(cursor.clone()),
                None if page.has_more => {
                    tracing::warn!("page has more results but no cursor, ending walk");
                    Next::Done
                }
                None => Next::Done,
            };
            self.buffer = page.items.into_iter();
        }
    }
}

// ---------------------------------------------------------------------------
// Platform-backed sources
// ---------------------------------------------------------------------------

/// The conversations the session's identity is subscribed to.
pub struct ConversationPages<T, F: ClientFactory> {
    session: SessionManager<T, F>,
}

impl<T, F> PageSource for ConversationPages<T, F>
where
    T: TokenProvider,
    F: ClientFactory,
{
    type Item = Conversation;

    async fn fetch(
        &self,
        cursor: Option<Cursor>,
    ) -> Result<Page<Conversation>, SessionError> {
        self.session
            .with_retry(|conn| {
                let cursor = cursor.clone();
                async move { conn.list_conversations(cursor).await }
            })
            .await
    }

    fn is_stale(&self) -> bool {
        self.session.is_closed()
    }
}

/// The message history of one conversation.
pub struct MessagePages<T, F: ClientFactory> {
    session: SessionManager<T, F>,
    conversation: ConversationId,
}

impl<T, F> PageSource for MessagePages<T, F>
where
    T: TokenProvider,
    F: ClientFactory,
{
    type Item = Message;

    async fn fetch(&self, cursor: Option<Cursor>) -> Result<Page<Message>, SessionError> {
        self.session
            .with_retry(|conn| {
                let conversation = self.conversation.clone();
                let cursor = cursor.clone();
                async move { conn.list_messages(&conversation, cursor).await }
            })
            .await
    }

    fn is_stale(&self) -> bool {
        self.session.is_closed()
    }
}

impl<T, F> SessionManager<T, F>
where
    T: TokenProvider,
    F: ClientFactory,
{
    /// Pages through the conversations of the current identity.
    pub fn conversations(&self) -> PaginatedFetcher<ConversationPages<T, F>> {
        PaginatedFetcher::new(ConversationPages {
            session: self.clone(),
        })
    }

    /// Pages through the messages of `conversation`.
    pub fn messages(
        &self,
        conversation: ConversationId,
    ) -> PaginatedFetcher<MessagePages<T, F>> {
        PaginatedFetcher::new(MessagePages {
            session: self.clone(),
            conversation,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use futures_util::{StreamExt, TryStreamExt};
    use parley_client::{ClientError, MemoryPlatform};
    use parley_protocol::Identity;

    use super::*;
    use crate::SessionConfig;

    // -- Helpers ----------------------------------------------------------

    /// Serves pre-scripted pages and records the cursors it was asked for.
    #[derive(Clone, Default)]
    struct ScriptedSource {
        pages: Arc<Mutex<VecDeque<Result<Page<u32>, SessionError>>>>,
        requested: Arc<Mutex<Vec<Option<Cursor>>>>,
        stale: Arc<AtomicBool>,
        /// Go stale as soon as the next page has been served.
        stale_after_fetch: Arc<AtomicBool>,
    }

    impl ScriptedSource {
        fn with_pages(pages: Vec<Result<Page<u32>, SessionError>>) -> Self {
            let source = Self::default();
            source.pages.lock().unwrap().extend(pages);
            source
        }

        fn requested(&self) -> Vec<Option<Cursor>> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl PageSource for ScriptedSource {
        type Item = u32;

        async fn fetch(&self, cursor: Option<Cursor>) -> Result<Page<u32>, SessionError> {
            self.requested.lock().unwrap().push(cursor);
            tokio::task::yield_now().await;
            if self.stale_after_fetch.load(Ordering::SeqCst) {
                self.stale.store(true, Ordering::SeqCst);
            }
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Page::last(vec![])))
        }

        fn is_stale(&self) -> bool {
            self.stale.load(Ordering::SeqCst)
        }
    }

    fn cursor(raw: &str) -> Cursor {
        Cursor(raw.to_string())
    }

    fn three_pages() -> Vec<Result<Page<u32>, SessionError>> {
        vec![
            Ok(Page::more(vec![1, 2], cursor("c1"))),
            Ok(Page::more(vec![3, 4], cursor("c2"))),
            Ok(Page::last(vec![5])),
        ]
    }

    // =====================================================================
    // fetch_page()
    // =====================================================================

    #[tokio::test]
    async fn test_fetch_page_passes_cursor_through() {
        let source = ScriptedSource::with_pages(three_pages());
        let fetcher = PaginatedFetcher::new(source.clone());

        let page = fetcher.fetch_page(Some(cursor("c9"))).await.unwrap();

        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(source.requested(), vec![Some(cursor("c9"))]);
    }

    // =====================================================================
    // drain_all()
    // =====================================================================

    #[tokio::test]
    async fn test_drain_all_concatenates_pages_in_order() {
        let source = ScriptedSource::with_pages(three_pages());

        let items: Vec<u32> = PaginatedFetcher::new(source.clone())
            .drain_all()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            source.requested(),
            vec![None, Some(cursor("c1")), Some(cursor("c2"))]
        );
    }

    #[tokio::test]
    async fn test_drain_all_fetches_lazily() {
        let source = ScriptedSource::with_pages(three_pages());
        let stream = PaginatedFetcher::new(source.clone()).drain_all();
        assert!(source.requested().is_empty(), "nothing fetched before polling");

        let first_two: Vec<_> = stream.take(2).collect().await;

        assert_eq!(first_two.len(), 2);
        assert_eq!(source.requested().len(), 1, "second page not needed yet");
    }

    #[tokio::test]
    async fn test_drain_all_skips_empty_intermediate_page() {
        let source = ScriptedSource::with_pages(vec![
            Ok(Page::more(vec![], cursor("c1"))),
            Ok(Page::last(vec![7])),
        ]);

        let items: Vec<u32> = PaginatedFetcher::new(source)
            .drain_all()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(items, vec![7]);
    }

    #[tokio::test]
    async fn test_drain_all_error_ends_stream_after_yielding_it() {
        let source = ScriptedSource::with_pages(vec![
            Ok(Page::more(vec![1], cursor("c1"))),
            Err(SessionError::Platform("reset".into())),
            Ok(Page::last(vec![2])),
        ]);

        let results: Vec<_> = PaginatedFetcher::new(source.clone())
            .drain_all()
            .collect()
            .await;

        assert_eq!(
            results,
            vec![Ok(1), Err(SessionError::Platform("reset".into()))]
        );
        assert_eq!(source.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_drain_all_more_without_cursor_stops() {
        let source = ScriptedSource::with_pages(vec![Ok(Page {
            items: vec![1],
            has_more: true,
            cursor: None,
        })]);

        let items: Vec<u32> = PaginatedFetcher::new(source.clone())
            .drain_all()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(items, vec![1]);
        assert_eq!(source.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_drain_all_stale_source_yields_nothing() {
        let source = ScriptedSource::with_pages(three_pages());
        source.stale.store(true, Ordering::SeqCst);

        let results: Vec<_> = PaginatedFetcher::new(source.clone())
            .drain_all()
            .collect()
            .await;

        assert!(results.is_empty());
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn test_drain_all_discards_page_arriving_after_teardown() {
        let source = ScriptedSource::with_pages(three_pages());
        source.stale_after_fetch.store(true, Ordering::SeqCst);

        let results: Vec<_> = PaginatedFetcher::new(source.clone())
            .drain_all()
            .collect()
            .await;

        assert!(results.is_empty());
        assert_eq!(source.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_drain_all_discards_error_arriving_after_teardown() {
        let source = ScriptedSource::with_pages(vec![Err(SessionError::Platform("reset".into()))]);
        source.stale_after_fetch.store(true, Ordering::SeqCst);

        let results: Vec<_> = PaginatedFetcher::new(source.clone())
            .drain_all()
            .collect()
            .await;

        assert!(results.is_empty(), "got {results:?}");
        assert_eq!(source.requested().len(), 1);
    }

    // =====================================================================
    // SessionManager::conversations() / messages()
    // =====================================================================

    fn memory_session(
        page_size: usize,
    ) -> (SessionManager<MemoryPlatform, MemoryPlatform>, MemoryPlatform) {
        let platform = MemoryPlatform::new(page_size);
        let manager = SessionManager::new(
            &SessionConfig::default(),
            platform.clone(),
            platform.clone(),
        );
        (manager, platform)
    }

    #[tokio::test]
    async fn test_conversations_walks_every_page() {
        let (manager, platform) = memory_session(2);
        for (i, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            platform.add_conversation(id, &["alice", "bob"], i as u64);
        }
        platform.add_conversation("other", &["carol"], 99);
        manager.init("alice").await.unwrap();

        let ids: Vec<String> = manager
            .conversations()
            .drain_all()
            .map_ok(|c| c.id.0)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(ids, vec!["e", "d", "c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_messages_recovers_from_expired_credential() {
        let (manager, platform) = memory_session(10);
        let conv = platform.add_conversation("support", &["alice"], 0);
        platform.post_message(&conv, "alice", "hello", 1);
        manager.init("alice").await.unwrap();
        platform.revoke_all(&Identity::from("alice"));

        let bodies: Vec<String> = manager
            .messages(conv)
            .drain_all()
            .map_ok(|m| m.body)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(bodies, vec!["hello"]);
        assert_eq!(platform.tokens_issued(), 2);
    }

    #[tokio::test]
    async fn test_conversations_before_init_is_uninitialized() {
        let (manager, _) = memory_session(10);

        let results: Vec<_> = manager.conversations().drain_all().collect().await;

        assert_eq!(results, vec![Err(SessionError::Uninitialized)]);
    }

    #[tokio::test]
    async fn test_conversations_persistent_failure_surfaces_second_error() {
        let (manager, platform) = memory_session(10);
        platform.add_conversation("a", &["alice"], 0);
        manager.init("alice").await.unwrap();
        platform.inject_failures([
            ClientError::Request("first".into()),
            ClientError::Request("second".into()),
        ]);

        let results: Vec<_> = manager.conversations().drain_all().collect().await;

        assert_eq!(results, vec![Err(SessionError::Platform("second".into()))]);
    }
}

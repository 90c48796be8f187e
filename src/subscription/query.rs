//! Cached remote data as subscriptions, in the spirit of TanStack Query.
//!
//! A [`Query`] pairs a [`QueryKey`] with an async fetcher. Subscribing to it
//! yields [`QueryResult`]s as the cache slot for that key changes:
//!
//! 1. cached and fresh: `Success` right away, no request
//! 2. cached but stale: `Success { is_stale: true, is_fetching: true }`, then a
//!    background refetch and a fresh `Success` (or `Error`)
//! 3. nothing cached: `Loading`, then `Success` or `Error`
//! 4. afterwards the query keeps watching its key: writes by other queries or
//!    by [`QueryClient::set_query_data`] are re-emitted, invalidation refetches
//!
//! Requests are de-duplicated per key by the [`QueryClient`], so any number of
//! subscribers can share one slot.
//!
//! A query can be disabled. It then never fetches, but still reports whatever
//! was seeded under its key. Enabling it changes its subscription identity, so
//! an application expresses "fetch B once A is known" simply by returning
//! `Query::new(..).enabled(a.is_some())` from `subscriptions`.
//!
//! ```rust,ignore
//! fn subscriptions(&self) -> Vec<Subscription<Message>> {
//!     vec![
//!         Subscription::new(Query::new(
//!             QueryKey::new("breeds").with(self.page),
//!             move || Box::pin(fetch_page(page)),
//!             self.query_client.clone(),
//!         ))
//!         .map(Message::Breeds),
//!     ]
//! }
//! ```

mod cache;
mod client;
mod config;
mod error;
mod key;

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::debug;

use crate::subscription::{SubscriptionId, SubscriptionSource};

pub use cache::EntryStatus;
pub use client::{CacheEvent, Fetcher, QueryClient};
pub use config::{QueryConfig, StaleTime};
pub use error::QueryError;
pub use key::{KeyPart, QueryKey};

use client::Observer;

/// What a query currently knows.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// Disabled and nothing cached.
    Idle,
    /// First fetch in progress, no data yet.
    Loading,
    Success {
        data: T,
        /// The data is older than the stale time.
        is_stale: bool,
        /// A background refetch is running.
        is_fetching: bool,
    },
    /// The fetch failed; the message is meant to be shown as-is.
    Error(String),
}

impl<T> QueryState<T> {
    /// Returns the data, if the query has any.
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Returns `true` if the query is disabled and has nothing cached.
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns `true` if the query is loading with no data to show.
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns `true` if the query has data.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns `true` if the last fetch failed.
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the error message, if the last fetch failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Returns `true` if the data is older than the stale time.
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Success { is_stale: true, .. })
    }

    /// A request is running, first load or background refresh.
    pub const fn is_fetching(&self) -> bool {
        matches!(
            self,
            Self::Loading
                | Self::Success {
                    is_fetching: true,
                    ..
                }
        )
    }
}

/// One emission of a [`Query`] subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// Key of the query that produced this result.
    pub key: QueryKey,
    /// What the query reported.
    pub state: QueryState<T>,
}

impl<T> QueryResult<T> {
    /// Shorthand for [`QueryState::data`].
    pub const fn data(&self) -> Option<&T> {
        self.state.data()
    }

    /// Shorthand for [`QueryState::is_loading`].
    pub const fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Shorthand for [`QueryState::is_success`].
    pub const fn is_success(&self) -> bool {
        self.state.is_success()
    }

    /// Shorthand for [`QueryState::is_error`].
    pub const fn is_error(&self) -> bool {
        self.state.is_error()
    }

    /// Shorthand for [`QueryState::is_stale`].
    pub const fn is_stale(&self) -> bool {
        self.state.is_stale()
    }

    /// Shorthand for [`QueryState::is_fetching`].
    pub const fn is_fetching(&self) -> bool {
        self.state.is_fetching()
    }
}

/// A cached, de-duplicated fetch exposed as a subscription.
pub struct Query<V> {
    key: QueryKey,
    fetcher: Option<Fetcher<V>>,
    stale_time: Option<StaleTime>,
    client: Arc<QueryClient>,
}

impl<V> Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new<F>(key: QueryKey, fetcher: F, client: Arc<QueryClient>) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<V, QueryError>> + Send + Sync + 'static,
    {
        Self {
            key,
            fetcher: Some(Arc::new(fetcher)),
            stale_time: None,
            client,
        }
    }

    /// A query that never fetches. It reports seeded data, or `Idle`.
    #[must_use]
    pub fn disabled(key: QueryKey, client: Arc<QueryClient>) -> Self {
        Self {
            key,
            fetcher: None,
            stale_time: None,
            client,
        }
    }

    /// Disables fetching when `enabled` is false.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        if !enabled {
            self.fetcher = None;
        }
        self
    }

    /// Overrides the client's default stale time for this query.
    #[must_use]
    pub fn stale_time(mut self, stale_time: StaleTime) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Returns the key this query reads and writes.
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Returns `true` if the query may fetch.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.fetcher.is_some()
    }
}

impl<V> SubscriptionSource for Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Output = QueryResult<V>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        let observer = Arc::new(Observed {
            key: self.key.clone(),
            fetcher: self.fetcher.clone(),
            stale_time: self.stale_time.unwrap_or(self.client.config().stale_time),
            client: Arc::clone(&self.client),
            _observer: self.client.observe(&self.key),
        });

        stream::unfold(Step::Initial, move |step| {
            let observed = Arc::clone(&observer);
            async move { observed.advance(step).await }
        })
        .boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.key.hash(&mut hasher);
        self.is_enabled().hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

enum Step {
    Initial,
    Fetch(broadcast::Receiver<CacheEvent>),
    Watch(broadcast::Receiver<CacheEvent>),
}

/// Per-stream state of a running query subscription.
struct Observed<V> {
    key: QueryKey,
    fetcher: Option<Fetcher<V>>,
    stale_time: StaleTime,
    client: Arc<QueryClient>,
    _observer: Observer,
}

impl<V> Observed<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn advance(&self, step: Step) -> Option<(QueryResult<V>, Step)> {
        match step {
            Step::Initial => Some(self.initial()),
            Step::Fetch(rx) => Some(self.fetch(rx).await),
            Step::Watch(rx) => self.watch(rx).await,
        }
    }

    fn initial(&self) -> (QueryResult<V>, Step) {
        let rx = self.client.subscribe_events();
        let cached = self.client.peek::<V>(&self.key, self.stale_time);
        let enabled = self.fetcher.is_some();

        match cached {
            Some((data, true)) if enabled => (self.success(data, true, true), Step::Fetch(rx)),
            Some((data, is_stale)) => (self.success(data, is_stale, false), Step::Watch(rx)),
            None if enabled => (self.result(QueryState::Loading), Step::Fetch(rx)),
            None => (self.result(QueryState::Idle), Step::Watch(rx)),
        }
    }

    /// `rx` was subscribed before the request started, so writes that land
    /// while it runs are still seen afterwards.
    async fn fetch(&self, mut rx: broadcast::Receiver<CacheEvent>) -> (QueryResult<V>, Step) {
        let Some(fetcher) = &self.fetcher else {
            return (self.result(QueryState::Idle), Step::Watch(rx));
        };

        let state = match self.client.fetch(&self.key, fetcher).await {
            Ok(data) => {
                // The fetch's own write is already queued; skip past it and
                // report whatever the cache holds now.
                drain(&mut rx);
                let data = self
                    .client
                    .peek::<V>(&self.key, self.stale_time)
                    .map_or(data, |(latest, _)| latest);
                QueryState::Success {
                    data,
                    is_stale: false,
                    is_fetching: false,
                }
            }
            Err(e) => QueryState::Error(e.to_string()),
        };
        (self.result(state), Step::Watch(rx))
    }

    async fn watch(
        &self,
        mut rx: broadcast::Receiver<CacheEvent>,
    ) -> Option<(QueryResult<V>, Step)> {
        loop {
            match rx.recv().await {
                Ok(CacheEvent::Updated(key)) if key == self.key => {
                    if let Some((data, is_stale)) = self.client.peek::<V>(&self.key, self.stale_time)
                    {
                        return Some((self.success(data, is_stale, false), Step::Watch(rx)));
                    }
                }
                Ok(CacheEvent::Invalidated(key)) if key == self.key && self.fetcher.is_some() => {
                    let state = match self.client.peek::<V>(&self.key, self.stale_time) {
                        Some((data, _)) => QueryState::Success {
                            data,
                            is_stale: true,
                            is_fetching: true,
                        },
                        None => QueryState::Loading,
                    };
                    return Some((self.result(state), Step::Fetch(rx)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(key = %self.key, skipped, "cache events lagged, re-reading");
                    if let Some((data, is_stale)) = self.client.peek::<V>(&self.key, self.stale_time)
                    {
                        return Some((self.success(data, is_stale, false), Step::Watch(rx)));
                    }
                }
                Ok(_) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn success(&self, data: V, is_stale: bool, is_fetching: bool) -> QueryResult<V> {
        self.result(QueryState::Success {
            data,
            is_stale,
            is_fetching,
        })
    }

    fn result(&self, state: QueryState<V>) -> QueryResult<V> {
        QueryResult {
            key: self.key.clone(),
            state,
        }
    }
}

/// Discards every event already queued on `rx`.
fn drain(rx: &mut broadcast::Receiver<CacheEvent>) {
    loop {
        match rx.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, Shared};
use futures::{FutureExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::command::Command;

use super::cache::{AnyData, CacheEntry, EntryStatus};
use super::config::{QueryConfig, StaleTime};
use super::error::QueryError;
use super::key::QueryKey;
use super::QueryState;

/// The async function behind a query.
pub type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, QueryError>> + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, Result<AnyData, QueryError>>>;

pub(super) const EVENT_CAPACITY: usize = 256;

/// Something happened to a cache slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// New data was written, by a fetch or by seeding.
    Updated(QueryKey),
    /// The entry was marked stale; observers should refetch.
    Invalidated(QueryKey),
    /// The entry was garbage collected.
    Removed(QueryKey),
}

/// Owner of every cached query result.
///
/// One client is created when the application starts and shared (behind an
/// `Arc`) by everything that reads or seeds data. Cloning is cheap and every
/// clone sees the same cache.
///
/// ```
/// use cat_breeds::subscription::query::{QueryClient, QueryConfig, QueryKey};
/// use std::time::Duration;
///
/// let client = QueryClient::with_config(QueryConfig::new(
///     Duration::from_secs(300), // stale_time
///     Duration::from_secs(300), // cache_time
/// ));
///
/// let key = QueryKey::new("breed").with("abys");
/// client.set_query_data(key.clone(), String::from("Abyssinian"));
/// assert_eq!(client.get_query_data::<String>(&key).as_deref(), Some("Abyssinian"));
/// ```
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<DashMap<QueryKey, CacheEntry>>,
    in_flight: Arc<DashMap<QueryKey, SharedFetch>>,
    events: broadcast::Sender<CacheEvent>,
    config: QueryConfig,
}

impl QueryClient {
    /// Creates a client with the default [`QueryConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    /// Creates a client with `config` as every query's default.
    #[must_use]
    pub fn with_config(config: QueryConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            cache: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            events,
            config,
        }
    }

    /// Returns the client's defaults.
    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Typed read of a cached value, fresh or not.
    pub fn get_query_data<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
        let mut entry = self.cache.get_mut(key)?;
        entry.touch();
        entry.data_as()
    }

    /// Writes `data` under `key` as fresh, without any request, and notifies
    /// live queries of that key.
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: QueryKey, data: T) {
        debug!(%key, "seeding cache");
        self.write(key, Arc::new(data));
    }

    fn write(&self, key: QueryKey, data: AnyData) {
        self.cache
            .entry(key.clone())
            .or_insert_with(CacheEntry::empty)
            .update(data);
        let _ = self.events.send(CacheEvent::Updated(key));
    }

    /// Cached value and whether it is stale under `stale_time`.
    pub(crate) fn peek<T: Clone + Send + Sync + 'static>(
        &self,
        key: &QueryKey,
        stale_time: StaleTime,
    ) -> Option<(T, bool)> {
        let mut entry = self.cache.get_mut(key)?;
        entry.touch();
        let data = entry.data_as::<T>()?;
        Some((data, entry.is_stale(stale_time)))
    }

    /// What a query for `key` would show right now, without fetching:
    /// the cached value, or `Loading` when there is none.
    pub fn cached_state<T: Clone + Send + Sync + 'static>(
        &self,
        key: &QueryKey,
        stale_time: StaleTime,
    ) -> QueryState<T> {
        match self.peek::<T>(key, stale_time) {
            Some((data, is_stale)) => QueryState::Success {
                data,
                is_stale,
                is_fetching: self.is_fetching(key),
            },
            None => QueryState::Loading,
        }
    }

    /// Whether a fetch for `key` is in flight.
    #[must_use]
    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.in_flight.contains_key(key)
    }

    #[must_use]
    pub fn status(&self, key: &QueryKey, stale_time: StaleTime) -> EntryStatus {
        let in_flight = self.is_fetching(key);
        self.cache.get(key).map_or(
            if in_flight {
                EntryStatus::Loading
            } else {
                EntryStatus::Empty
            },
            |entry| entry.status(stale_time, in_flight),
        )
    }

    /// Marks `key` stale and tells live queries to refetch it.
    pub fn invalidate_now(&self, key: &QueryKey) {
        debug!(%key, "invalidating");
        if let Some(mut entry) = self.cache.get_mut(key) {
            entry.mark_stale();
        }
        let _ = self.events.send(CacheEvent::Invalidated(key.clone()));
    }

    /// [`QueryClient::invalidate_now`] as a command, for use from `update`.
    pub fn invalidate<Msg: Send + 'static>(&self, key: &QueryKey) -> Command<Msg> {
        let client = self.clone();
        let key = key.clone();
        Command {
            stream: Some(
                futures::stream::once(async move { client.invalidate_now(&key) })
                    .filter_map(|()| async { None })
                    .boxed(),
            ),
        }
    }

    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Registers a live observer of `key` until the guard is dropped.
    pub(crate) fn observe(&self, key: &QueryKey) -> Observer {
        self.cache
            .entry(key.clone())
            .or_insert_with(CacheEntry::empty)
            .observe();
        Observer {
            client: self.clone(),
            key: key.clone(),
        }
    }

    /// Drops entries nobody observes that were not used within
    /// `cache_time`. Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let cache_time = self.config.cache_time;
        let mut removed = Vec::new();
        self.cache.retain(|key, entry| {
            let keep = !entry.should_gc(cache_time) || self.in_flight.contains_key(key);
            if !keep {
                removed.push(key.clone());
            }
            keep
        });

        if !removed.is_empty() {
            debug!(count = removed.len(), "garbage collected cache entries");
        }
        for key in &removed {
            let _ = self.events.send(CacheEvent::Removed(key.clone()));
        }
        removed.len()
    }

    /// Number of cache slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Runs `fetcher` for `key`, sharing the request with any fetch of the
    /// same key that is already in flight.
    ///
    /// The request runs on its own task: dropping the returned future does
    /// not cancel it, and its result is still written to the cache.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error once retries are exhausted.
    pub async fn fetch<T>(&self, key: &QueryKey, fetcher: &Fetcher<T>) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let data = self.start_or_join(key, fetcher).await?;
        data.downcast::<T>()
            .map(|data| T::clone(&data))
            .map_err(|_| QueryError::FetchError(format!("{key} is cached under another type")))
    }

    fn start_or_join<T>(&self, key: &QueryKey, fetcher: &Fetcher<T>) -> SharedFetch
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!(%key, "joining in-flight fetch");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                debug!(%key, "fetching");
                let task = tokio::spawn(self.clone().run_fetch(key.clone(), Arc::clone(fetcher)));
                let shared = async move {
                    task.await
                        .unwrap_or_else(|e| Err(QueryError::FetchError(e.to_string())))
                }
                .boxed()
                .shared();
                entry.insert(shared.clone());
                shared
            }
        }
    }

    async fn run_fetch<T>(self, key: QueryKey, fetcher: Fetcher<T>) -> Result<AnyData, QueryError>
    where
        T: Send + Sync + 'static,
    {
        let mut attempt = 0;
        let result = loop {
            match fetcher().await {
                Ok(data) => break Ok(data),
                Err(error) if attempt < self.config.retry => {
                    let delay = self.config.retry_delay_for(attempt);
                    warn!(%key, %error, attempt, ?delay, "fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => break Err(error),
            }
        };

        let outcome = match result {
            Ok(data) => {
                let data: AnyData = Arc::new(data);
                self.cache
                    .entry(key.clone())
                    .or_insert_with(CacheEntry::empty)
                    .update(Arc::clone(&data));
                Ok(data)
            }
            Err(error) => {
                warn!(%key, %error, "fetch failed");
                self.cache
                    .entry(key.clone())
                    .or_insert_with(CacheEntry::empty)
                    .fail(error.clone());
                Err(error)
            }
        };

        self.in_flight.remove(&key);
        if outcome.is_ok() {
            let _ = self.events.send(CacheEvent::Updated(key));
        }
        outcome
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.cache.len())
            .field("in_flight", &self.in_flight.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Keeps a cache entry alive for garbage collection while held.
pub(crate) struct Observer {
    client: QueryClient,
    key: QueryKey,
}

impl Drop for Observer {
    fn drop(&mut self) {
        if let Some(mut entry) = self.client.cache.get_mut(&self.key) {
            entry.release();
            entry.touch();
        }
    }
}

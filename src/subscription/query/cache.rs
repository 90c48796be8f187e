use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::StaleTime;
use super::error::QueryError;

/// A type-erased cached value.
pub(crate) type AnyData = Arc<dyn Any + Send + Sync>;

/// Lifecycle of a cache slot.
///
/// ```text
/// Empty -> Loading -> Fresh -> Stale -> Revalidating -> Fresh
///             \                             \
///              `-> Error                     `-> Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Nothing cached, nothing in flight.
    Empty,
    /// First fetch in flight.
    Loading,
    Fresh,
    /// Has data past its stale time (or invalidated); next access revalidates.
    Stale,
    /// Has stale data and a refetch is in flight.
    Revalidating,
    /// The last fetch failed.
    Error,
}

/// One slot in the query cache.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    data: Option<AnyData>,
    updated_at: Instant,
    last_used: Instant,
    is_invalidated: bool,
    error: Option<QueryError>,
    observers: usize,
}

impl CacheEntry {
    pub(crate) fn empty() -> Self {
        let now = Instant::now();
        Self {
            data: None,
            updated_at: now,
            last_used: now,
            is_invalidated: false,
            error: None,
            observers: 0,
        }
    }

    pub(crate) fn with_data(data: AnyData) -> Self {
        let mut entry = Self::empty();
        entry.data = Some(data);
        entry
    }

    /// Stores a new value, resetting staleness and any previous error.
    pub(crate) fn update(&mut self, data: AnyData) {
        let now = Instant::now();
        self.data = Some(data);
        self.updated_at = now;
        self.last_used = now;
        self.is_invalidated = false;
        self.error = None;
    }

    pub(crate) fn fail(&mut self, error: QueryError) {
        self.last_used = Instant::now();
        self.error = Some(error);
    }

    /// Typed copy of the value. `None` if empty or stored under another type.
    pub(crate) fn data_as<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        let data = Arc::clone(self.data.as_ref()?);
        data.downcast::<T>().ok().map(|data| T::clone(&data))
    }

    pub(crate) const fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub(crate) const fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    pub(crate) fn is_stale(&self, stale_time: StaleTime) -> bool {
        self.is_invalidated || stale_time.is_stale(self.updated_at.elapsed())
    }

    pub(crate) const fn mark_stale(&mut self) {
        self.is_invalidated = true;
    }

    pub(crate) fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    pub(crate) const fn observe(&mut self) {
        self.observers += 1;
    }

    pub(crate) const fn release(&mut self) {
        self.observers = self.observers.saturating_sub(1);
    }

    pub(crate) const fn observers(&self) -> usize {
        self.observers
    }

    /// Unobserved and untouched for longer than `cache_time`.
    pub(crate) fn should_gc(&self, cache_time: Duration) -> bool {
        self.observers == 0 && self.last_used.elapsed() > cache_time
    }

    /// Status of this slot given whether a fetch for it is in flight.
    pub(crate) fn status(&self, stale_time: StaleTime, in_flight: bool) -> EntryStatus {
        match (self.has_data(), in_flight) {
            (false, true) => EntryStatus::Loading,
            (true, true) if self.is_stale(stale_time) => EntryStatus::Revalidating,
            (true, true) => EntryStatus::Fresh,
            _ if self.error.is_some() => EntryStatus::Error,
            (false, false) => EntryStatus::Empty,
            (true, false) if self.is_stale(stale_time) => EntryStatus::Stale,
            (true, false) => EntryStatus::Fresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn entry_of<T: Send + Sync + 'static>(value: T) -> CacheEntry {
        CacheEntry::with_data(Arc::new(value))
    }

    #[test]
    fn test_data_as_checks_type() {
        let entry = entry_of(String::from("Abyssinian"));
        assert_eq!(entry.data_as::<String>().as_deref(), Some("Abyssinian"));
        assert_eq!(entry.data_as::<u32>(), None);
        assert_eq!(CacheEntry::empty().data_as::<String>(), None);
    }

    #[test]
    fn test_staleness_window() {
        let entry = entry_of(1_u32);
        assert!(!entry.is_stale(StaleTime::After(Duration::from_secs(60))));
        sleep(Duration::from_millis(10));
        assert!(entry.is_stale(StaleTime::After(Duration::from_millis(5))));
        assert!(!entry.is_stale(StaleTime::Never));
    }

    #[test]
    fn test_mark_stale_overrides_never() {
        let mut entry = entry_of(1_u32);
        entry.mark_stale();
        assert!(entry.is_stale(StaleTime::Never));

        entry.update(Arc::new(2_u32));
        assert!(!entry.is_stale(StaleTime::Never));
        assert_eq!(entry.data_as::<u32>(), Some(2));
    }

    #[test]
    fn test_update_clears_error() {
        let mut entry = CacheEntry::empty();
        entry.fail(QueryError::NetworkError("offline".into()));
        assert!(entry.error().is_some());

        entry.update(Arc::new(()));
        assert!(entry.error().is_none());
    }

    #[test]
    fn test_status_transitions() {
        let window = StaleTime::After(Duration::from_secs(60));
        let mut entry = CacheEntry::empty();
        assert_eq!(entry.status(window, false), EntryStatus::Empty);
        assert_eq!(entry.status(window, true), EntryStatus::Loading);

        entry.update(Arc::new(7_u32));
        assert_eq!(entry.status(window, false), EntryStatus::Fresh);

        entry.mark_stale();
        assert_eq!(entry.status(window, false), EntryStatus::Stale);
        assert_eq!(entry.status(window, true), EntryStatus::Revalidating);

        entry.fail(QueryError::FetchError("boom".into()));
        assert_eq!(entry.status(window, false), EntryStatus::Error);

        entry.update(Arc::new(8_u32));
        assert_eq!(entry.status(window, false), EntryStatus::Fresh);
    }

    #[test]
    fn test_gc_requires_no_observers() {
        let mut entry = entry_of(1_u32);
        entry.observe();
        sleep(Duration::from_millis(5));
        assert!(!entry.should_gc(Duration::from_millis(1)));

        entry.release();
        assert_eq!(entry.observers(), 0);
        assert!(entry.should_gc(Duration::from_millis(1)));

        entry.touch();
        assert!(!entry.should_gc(Duration::from_secs(60)));
    }
}

use std::time::Duration;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// How long a cached value counts as fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleTime {
    /// Fresh for this long after it was written.
    After(Duration),
    /// Never goes stale; the value is fetched at most once per session
    /// unless explicitly invalidated.
    Never,
}

impl StaleTime {
    /// Whether a value written `age` ago is stale.
    #[must_use]
    pub fn is_stale(self, age: Duration) -> bool {
        match self {
            Self::After(window) => age >= window,
            Self::Never => false,
        }
    }
}

impl From<Duration> for StaleTime {
    fn from(window: Duration) -> Self {
        Self::After(window)
    }
}

/// Configuration for query behavior.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Default freshness window. Fresh values are served without a request;
    /// stale ones are served and revalidated in the background.
    pub stale_time: StaleTime,

    /// How long an unobserved entry survives before garbage collection.
    pub cache_time: Duration,

    /// Extra attempts after a failed fetch.
    pub retry: u32,

    /// Delay before the first retry; doubles per attempt, capped at 30s.
    pub retry_delay: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: StaleTime::After(Duration::ZERO),
            cache_time: Duration::from_secs(5 * 60),
            retry: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl QueryConfig {
    #[must_use]
    pub fn new(stale_time: impl Into<StaleTime>, cache_time: Duration) -> Self {
        Self {
            stale_time: stale_time.into(),
            cache_time,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: u32, retry_delay: Duration) -> Self {
        self.retry = retry;
        self.retry_delay = retry_delay;
        self
    }

    /// Back-off before retry number `attempt` (0-based).
    #[must_use]
    pub fn retry_delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.retry_delay
            .checked_mul(factor)
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueryConfig::default();
        assert_eq!(config.stale_time, StaleTime::After(Duration::ZERO));
        assert_eq!(config.cache_time, Duration::from_secs(300));
        assert_eq!(config.retry, 3);
    }

    #[test]
    fn test_new_keeps_retry_defaults() {
        let config = QueryConfig::new(Duration::from_secs(300), Duration::from_secs(600));
        assert_eq!(config.stale_time, StaleTime::After(Duration::from_secs(300)));
        assert_eq!(config.cache_time, Duration::from_secs(600));
        assert_eq!(config.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let config = QueryConfig::default();
        assert_eq!(config.retry_delay_for(0), Duration::from_secs(1));
        assert_eq!(config.retry_delay_for(1), Duration::from_secs(2));
        assert_eq!(config.retry_delay_for(2), Duration::from_secs(4));
        assert_eq!(config.retry_delay_for(10), MAX_RETRY_DELAY);
        assert_eq!(config.retry_delay_for(40), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_never_is_never_stale() {
        assert!(!StaleTime::Never.is_stale(Duration::from_secs(u64::from(u32::MAX))));
        assert!(StaleTime::After(Duration::ZERO).is_stale(Duration::ZERO));
        assert!(!StaleTime::After(Duration::from_secs(5)).is_stale(Duration::from_secs(4)));
    }
}

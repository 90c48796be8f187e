//! Command line and environment settings.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::api::DEFAULT_BASE_URL;
use crate::breeds::DEFAULT_GALLERY_LIMIT;
use crate::subscription::query::QueryConfig;

/// Browse the cat breed catalog in the terminal.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub struct Config {
    /// API root; endpoint paths are resolved against it
    #[arg(long, env = "CAT_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Sent as the `x-api-key` header
    #[arg(long, env = "CAT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Seconds before cached data is refetched in the background
    #[arg(long, default_value_t = 300)]
    pub stale_secs: u64,

    /// Seconds an unused cache entry is kept
    #[arg(long, default_value_t = 300)]
    pub cache_secs: u64,

    /// Retries for a failed request
    #[arg(long, default_value_t = 3)]
    pub retry: u32,

    /// Pictures requested for a breed's gallery
    #[arg(long, default_value_t = DEFAULT_GALLERY_LIMIT)]
    pub gallery_limit: u32,

    /// Frames drawn per second
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub frame_rate: u32,

    /// Write logs here; nothing is logged without it
    #[arg(long, env = "CAT_BREEDS_LOG")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Cache settings for the query client.
    #[must_use]
    pub fn query_config(&self) -> QueryConfig {
        let defaults = QueryConfig::default();
        QueryConfig::new(
            Duration::from_secs(self.stale_secs),
            Duration::from_secs(self.cache_secs),
        )
        .with_retry(self.retry, defaults.retry_delay)
    }

    /// How often unused cache entries are swept.
    #[must_use]
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.cache_secs.clamp(1, 60))
    }
}

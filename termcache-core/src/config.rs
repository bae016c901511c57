//! Configuration types

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, TermcacheResult};
use crate::transform::{Transformer, DEFAULT_AUTHORITY, DEFAULT_KIND};

/// Cache and load pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    // Storage
    /// Directory holding the LMDB environment.
    pub cache_path: PathBuf,
    /// Maximum size of the LMDB map in megabytes.
    pub map_size_mb: usize,
    /// How long `close` waits for the environment to be released.
    pub close_timeout: Duration,

    // Load pipeline
    /// Number of terms requested per upstream page.
    pub page_size: usize,
    /// Capacity of the producer → writer batch queue. Producers block once
    /// this many transformed pages are waiting to be written.
    pub batch_queue_capacity: usize,

    // Query
    /// Capacity of the hand-off buffer between a cursor scan and its consumer.
    pub stream_buffer: usize,
    /// Base URL used to build record links.
    pub base_url: String,

    // Transformation
    pub taxonomy: String,
    pub record_kind: String,
    pub authority: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("cache"),
            map_size_mb: 256,
            close_timeout: Duration::from_secs(5),
            page_size: 10_000,
            batch_queue_capacity: 10,
            stream_buffer: 64,
            base_url: "http://localhost:8080/transformers/people".to_string(),
            taxonomy: "PN".to_string(),
            record_kind: DEFAULT_KIND.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
        }
    }
}

impl CacheConfig {
    /// Create CacheConfig from environment variables.
    ///
    /// Environment variables (all optional, defaults from [`CacheConfig::default`]):
    /// - `TERMCACHE_CACHE_PATH`
    /// - `TERMCACHE_MAP_SIZE_MB`
    /// - `TERMCACHE_PAGE_SIZE`
    /// - `TERMCACHE_BATCH_QUEUE_CAPACITY`
    /// - `TERMCACHE_STREAM_BUFFER`
    /// - `TERMCACHE_BASE_URL`
    /// - `TERMCACHE_TAXONOMY`
    /// - `TERMCACHE_RECORD_KIND`
    /// - `TERMCACHE_AUTHORITY`
    /// - `TERMCACHE_CLOSE_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            cache_path: std::env::var("TERMCACHE_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            map_size_mb: env_parse("TERMCACHE_MAP_SIZE_MB").unwrap_or(defaults.map_size_mb),
            close_timeout: env_parse("TERMCACHE_CLOSE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.close_timeout),
            page_size: env_parse("TERMCACHE_PAGE_SIZE").unwrap_or(defaults.page_size),
            batch_queue_capacity: env_parse("TERMCACHE_BATCH_QUEUE_CAPACITY")
                .unwrap_or(defaults.batch_queue_capacity),
            stream_buffer: env_parse("TERMCACHE_STREAM_BUFFER").unwrap_or(defaults.stream_buffer),
            base_url: std::env::var("TERMCACHE_BASE_URL").unwrap_or(defaults.base_url),
            taxonomy: std::env::var("TERMCACHE_TAXONOMY").unwrap_or(defaults.taxonomy),
            record_kind: std::env::var("TERMCACHE_RECORD_KIND").unwrap_or(defaults.record_kind),
            authority: std::env::var("TERMCACHE_AUTHORITY").unwrap_or(defaults.authority),
        }
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - page_size, batch_queue_capacity, stream_buffer and map_size_mb > 0
    /// - taxonomy and record_kind are non-empty
    pub fn validate(&self) -> TermcacheResult<()> {
        for (field, value) in [
            ("page_size", self.page_size),
            ("batch_queue_capacity", self.batch_queue_capacity),
            ("stream_buffer", self.stream_buffer),
            ("map_size_mb", self.map_size_mb),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: format!("{} must be greater than 0", field),
                }
                .into());
            }
        }

        if self.taxonomy.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "taxonomy".to_string(),
            }
            .into());
        }

        if self.record_kind.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "record_kind".to_string(),
            }
            .into());
        }

        if self.cache_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "cache_path".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Transformer configured for this cache instance.
    pub fn transformer(&self) -> Transformer {
        Transformer::new(&self.taxonomy)
            .with_kind(&self.record_kind)
            .with_authority(&self.authority)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

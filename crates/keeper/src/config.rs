//! Configuration traits for keeper components.
//!
//! Traits define *what* configuration is needed; CLI args in [`crate::args`]
//! implement them directly, and [`CacheOptions`] is the plain builder for
//! programmatic use.

use core::time::Duration;

/// Default maximum number of cached records.
pub const DEFAULT_CACHE_ENTRIES: usize = 1000;

/// Configuration for the record cache.
pub trait RecordCacheConfig {
    /// Maximum number of cached records.
    fn max_entries(&self) -> usize;

    /// Maximum total size of cached keys and values in bytes.
    fn max_bytes(&self) -> Option<usize>;

    /// Maximum time a cached record is served before it is refetched.
    fn max_age(&self) -> Option<Duration>;

    /// Whether values are deep-copied when entering or leaving the cache.
    fn clone_on_access(&self) -> bool;
}

/// Record cache options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of cached records.
    pub max_entries: usize,
    /// Maximum total size in bytes.
    pub max_bytes: Option<usize>,
    /// Maximum entry age.
    pub max_age: Option<Duration>,
    /// Deep-copy values on cache set and get.
    pub clone_on_access: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_ENTRIES,
            max_bytes: None,
            max_age: None,
            clone_on_access: false,
        }
    }
}

impl CacheOptions {
    /// Copy the options out of any cache configuration.
    pub fn from_config(config: &impl RecordCacheConfig) -> Self {
        Self {
            max_entries: config.max_entries(),
            max_bytes: config.max_bytes(),
            max_age: config.max_age(),
            clone_on_access: config.clone_on_access(),
        }
    }

    /// Set the maximum number of entries.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the maximum total size in bytes.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Set the maximum entry age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Enable or disable deep copies.
    pub fn with_clone_on_access(mut self, enabled: bool) -> Self {
        self.clone_on_access = enabled;
        self
    }
}

impl RecordCacheConfig for CacheOptions {
    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn max_bytes(&self) -> Option<usize> {
        self.max_bytes
    }

    fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    fn clone_on_access(&self) -> bool {
        self.clone_on_access
    }
}

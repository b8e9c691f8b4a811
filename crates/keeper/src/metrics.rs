//! Record cache metrics.

use metrics::Counter;

/// Record cache metrics
#[derive(Clone, Debug)]
pub(crate) struct CacheMetrics {
    /// Number of reads served from the cache
    pub(crate) hits: Counter,
    /// Number of reads that went to the inner store
    pub(crate) misses: Counter,
    /// Number of entries evicted to respect the cache bounds
    pub(crate) evictions: Counter,
    /// Number of speculative entries removed after a failed write
    pub(crate) rollbacks: Counter,
    /// Number of writes skipped because the cache already held the value
    pub(crate) skipped_writes: Counter,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self {
            hits: metrics::counter!("keeper.cache.hits"),
            misses: metrics::counter!("keeper.cache.misses"),
            evictions: metrics::counter!("keeper.cache.evictions"),
            rollbacks: metrics::counter!("keeper.cache.rollbacks"),
            skipped_writes: metrics::counter!("keeper.cache.skipped_writes"),
        }
    }
}

//! Read-aside, write-through caching keeper.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use keeper_store::{
    BatchOp, BatchOptions, ChainedBatch, KeyValueStore, PutOptions, StoreError, StoreResult,
};
use tracing::{debug, trace, warn};

use crate::cache::{CacheStats, RecordCache};
use crate::config::RecordCacheConfig;

/// A keeper serving reads from an LRU cache in front of an inner keeper.
///
/// Writes are cached speculatively before the inner keeper confirms them and
/// rolled back if it rejects them. Concurrent calls on the same key are not
/// serialized: each completion applies its cache effect when it arrives, so
/// the last completion wins. A successful write re-caches its value, and a
/// failed one evicts the key even if another writer cached it meanwhile.
///
/// Batches have two known gaps:
/// - a failed batch does not restore entries evicted for its `del` entries
/// - redundant `put` entries are dropped regardless of their position, so
///   `[del k, put k v]` with `v` already cached reaches the inner keeper as
///   `[del k]` and removes `k`
#[derive(Debug)]
pub struct CachedKeeper<S> {
    inner: S,
    cache: Arc<RecordCache>,
}

impl<S: KeyValueStore> CachedKeeper<S> {
    /// Wrap `inner` with a cache built from `config`.
    pub fn new(inner: S, config: &impl RecordCacheConfig) -> Self {
        Self::with_cache(inner, Arc::new(RecordCache::new(config)))
    }

    /// Wrap `inner` with an existing cache.
    pub fn with_cache(inner: S, cache: Arc<RecordCache>) -> Self {
        Self { inner, cache }
    }

    /// The wrapped keeper.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The record cache.
    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Apply batch entries to the cache in order.
    fn apply(&self, ops: &[BatchOp]) {
        for op in ops {
            match op {
                BatchOp::Put { key, value, .. } => self.cache.insert(key.clone(), value.clone()),
                BatchOp::Del { key } => {
                    self.cache.remove(key);
                }
            }
        }
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for CachedKeeper<S> {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        // Check cache first
        if let Some(value) = self.cache.get(key) {
            trace!(key = %hex::encode(key), "Cache hit");
            return Ok(Some(value));
        }

        let value = self.inner.get(key).await?;
        if let Some(value) = &value {
            trace!(key = %hex::encode(key), "Cache miss, hydrating");
            self.cache.insert(Bytes::copy_from_slice(key), value.clone());
        }
        Ok(value)
    }

    async fn put(&self, key: Bytes, value: Bytes, options: PutOptions) -> StoreResult<()> {
        if self.cache.holds(&key, &value) {
            trace!(key = %hex::encode(&key), "Value already cached, skipping write");
            self.cache.record_skipped_writes(1);
            return Ok(());
        }

        self.cache.insert(key.clone(), value.clone());
        if let Err(err) = self.inner.put(key.clone(), value.clone(), options).await {
            self.cache.rollback(&key);
            warn!(key = %hex::encode(&key), %err, "Write failed, rolled back cached value");
            return Err(err);
        }

        // Concurrent writers may have replaced the entry meanwhile
        self.cache.insert(key.clone(), value);
        debug!(key = %hex::encode(&key), "Stored record");
        Ok(())
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        self.cache.remove(key);
        self.inner.del(key).await?;
        debug!(key = %hex::encode(key), "Removed record");
        Ok(())
    }

    async fn batch(&self, ops: Vec<BatchOp>, options: BatchOptions) -> StoreResult<()> {
        let total = ops.len();
        let ops: Vec<BatchOp> = ops
            .into_iter()
            .filter(|op| match op {
                BatchOp::Put { key, value, .. } => !self.cache.holds(key, value),
                BatchOp::Del { .. } => true,
            })
            .collect();
        self.cache.record_skipped_writes((total - ops.len()) as u64);

        if ops.is_empty() {
            trace!(skipped = total, "Every batch entry already cached");
            return Ok(());
        }

        let put_keys: Vec<Bytes> = ops
            .iter()
            .filter(|op| op.is_put())
            .map(|op| op.key().clone())
            .collect();
        self.apply(&ops);

        let len = ops.len();
        if let Err(err) = self.inner.batch(ops.clone(), options).await {
            // Deleted entries are not restored
            for key in &put_keys {
                self.cache.rollback(key);
            }
            warn!(ops = len, rolled_back = put_keys.len(), %err, "Batch failed, rolled back cached puts");
            return Err(err);
        }

        self.apply(&ops);
        debug!(ops = len, skipped = total - len, "Committed batch");
        Ok(())
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        Err(StoreError::UnsupportedUsage {
            reason: "chained batch not supported",
        })
    }

    async fn close(&self) -> StoreResult<()> {
        let result = self.inner.close().await;
        self.cache.clear();
        result
    }
}

//! Ordered in-memory backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{
    BatchOp, BatchOptions, ChainedBatch, KeyValueStore, PutOptions, StoreError, StoreResult,
};

/// In-memory ordered key-value store.
///
/// Batches are applied under a single write lock, so they are atomic with
/// respect to every other operation on the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<Bytes, Bytes>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns true if `key` is stored.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.records.read().contains_key(key)
    }

    /// Snapshot of all keys in order.
    pub fn keys(&self) -> Vec<Bytes> {
        self.records.read().keys().cloned().collect()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::backend("store is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.ensure_open()?;
        Ok(self.records.read().get(key).cloned())
    }

    async fn put(&self, key: Bytes, value: Bytes, _options: PutOptions) -> StoreResult<()> {
        self.ensure_open()?;
        self.records.write().insert(key, value);
        Ok(())
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        self.ensure_open()?;
        self.records.write().remove(key);
        Ok(())
    }

    async fn batch(&self, ops: Vec<BatchOp>, _options: BatchOptions) -> StoreResult<()> {
        self.ensure_open()?;
        let mut records = self.records.write();
        for op in ops {
            match op {
                BatchOp::Put { key, value, .. } => {
                    records.insert(key, value);
                }
                BatchOp::Del { key } => {
                    records.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        self.ensure_open()?;
        Ok(ChainedBatch::new(self))
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

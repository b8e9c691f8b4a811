//! The key-value capability interface.
//!
//! Every layer of a keeper stack (backend, encryption adapter, validating
//! keeper, cache) implements [`KeyValueStore`] and only depends on the
//! [`KeyValueStore`] below it.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BatchOp, BatchOptions, PutOptions, StoreResult};

/// Key-value capability interface.
///
/// Each call completes exactly once through its returned future. The only
/// synchronous method is [`chained_batch`](Self::chained_batch), whose errors
/// signal misuse rather than data problems.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `None` if the key doesn't exist.
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>>;

    /// Write `value` under `key`, overwriting any previous value.
    async fn put(&self, key: Bytes, value: Bytes, options: PutOptions) -> StoreResult<()>;

    /// Remove `key`.
    ///
    /// Returns `Ok(())` even if the key didn't exist.
    async fn del(&self, key: &[u8]) -> StoreResult<()>;

    /// Apply a materialized list of operations as one unit.
    async fn batch(&self, ops: Vec<BatchOp>, options: BatchOptions) -> StoreResult<()>;

    /// Start an incrementally built batch.
    ///
    /// Layers that need to inspect a batch before it is written reject this
    /// with [`StoreError::UnsupportedUsage`](crate::StoreError::UnsupportedUsage).
    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>>;

    /// Release the store. Later calls fail with a backend error.
    async fn close(&self) -> StoreResult<()>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn put(&self, key: Bytes, value: Bytes, options: PutOptions) -> StoreResult<()> {
        (**self).put(key, value, options).await
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        (**self).del(key).await
    }

    async fn batch(&self, ops: Vec<BatchOp>, options: BatchOptions) -> StoreResult<()> {
        (**self).batch(ops, options).await
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        (**self).chained_batch()
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }
}

/// Incrementally built batch, written with a single [`KeyValueStore::batch`] call.
#[must_use = "a chained batch does nothing until written"]
pub struct ChainedBatch<'a> {
    store: &'a dyn KeyValueStore,
    ops: Vec<BatchOp>,
    options: BatchOptions,
}

impl<'a> ChainedBatch<'a> {
    /// Start an empty batch against `store`.
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self {
            store,
            ops: Vec::new(),
            options: BatchOptions::default(),
        }
    }

    /// Queue a `put`.
    pub fn put(mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.ops.push(BatchOp::put(key, value));
        self
    }

    /// Queue a `del`.
    pub fn del(mut self, key: impl Into<Bytes>) -> Self {
        self.ops.push(BatchOp::del(key));
        self
    }

    /// Set the batch-wide options.
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Write the queued operations.
    pub async fn write(self) -> StoreResult<()> {
        self.store.batch(self.ops, self.options).await
    }
}

impl core::fmt::Debug for ChainedBatch<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChainedBatch")
            .field("ops", &self.ops)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

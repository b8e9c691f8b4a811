//! Instrumented stores.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use keeper_store::{
    BatchOp, BatchOptions, ChainedBatch, KeyValueStore, MemoryStore, PutOptions, StoreError,
    StoreResult,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// A call observed by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedOp {
    /// `get(key)`
    Get(Bytes),
    /// `put(key, value, options)`
    Put {
        /// Key written.
        key: Bytes,
        /// Value written.
        value: Bytes,
        /// Options passed.
        options: PutOptions,
    },
    /// `del(key)`
    Del(Bytes),
    /// `batch(ops, options)`
    Batch(Vec<BatchOp>),
    /// `close()`
    Close,
}

/// Records every call before delegating to the inner store.
#[derive(Debug, Default)]
pub struct RecordingStore<S = MemoryStore> {
    inner: S,
    ops: Mutex<Vec<RecordedOp>>,
}

impl RecordingStore {
    /// Record calls against a fresh [`MemoryStore`].
    pub fn memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: KeyValueStore> RecordingStore<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            ops: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// All recorded calls in order.
    pub fn ops(&self) -> Vec<RecordedOp> {
        self.ops.lock().clone()
    }

    /// Number of `get` calls.
    pub fn gets(&self) -> usize {
        self.count(|op| matches!(op, RecordedOp::Get(_)))
    }

    /// Number of `put` calls.
    pub fn puts(&self) -> usize {
        self.count(|op| matches!(op, RecordedOp::Put { .. }))
    }

    /// Number of `del` calls.
    pub fn dels(&self) -> usize {
        self.count(|op| matches!(op, RecordedOp::Del(_)))
    }

    /// Number of `batch` calls.
    pub fn batches(&self) -> usize {
        self.count(|op| matches!(op, RecordedOp::Batch(_)))
    }

    /// Number of calls of any kind.
    pub fn calls(&self) -> usize {
        self.ops.lock().len()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.ops.lock().clear();
    }

    fn count(&self, f: impl Fn(&RecordedOp) -> bool) -> usize {
        self.ops.lock().iter().filter(|op| f(op)).count()
    }

    fn record(&self, op: RecordedOp) {
        self.ops.lock().push(op);
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for RecordingStore<S> {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.record(RecordedOp::Get(Bytes::copy_from_slice(key)));
        self.inner.get(key).await
    }

    async fn put(&self, key: Bytes, value: Bytes, options: PutOptions) -> StoreResult<()> {
        self.record(RecordedOp::Put {
            key: key.clone(),
            value: value.clone(),
            options,
        });
        self.inner.put(key, value, options).await
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        self.record(RecordedOp::Del(Bytes::copy_from_slice(key)));
        self.inner.del(key).await
    }

    async fn batch(&self, ops: Vec<BatchOp>, options: BatchOptions) -> StoreResult<()> {
        self.record(RecordedOp::Batch(ops.clone()));
        self.inner.batch(ops, options).await
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        Ok(ChainedBatch::new(self))
    }

    async fn close(&self) -> StoreResult<()> {
        self.record(RecordedOp::Close);
        self.inner.close().await
    }
}

/// In-memory store whose writes can be made to fail.
///
/// Failing calls leave the stored data untouched.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
    fail_dels: AtomicBool,
    fail_batches: AtomicBool,
}

impl FailingStore {
    /// Create a store with no failures scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing memory store.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Make `get` calls fail or succeed.
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Make `put` calls fail or succeed.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make `del` calls fail or succeed.
    pub fn fail_dels(&self, fail: bool) {
        self.fail_dels.store(fail, Ordering::SeqCst);
    }

    /// Make `batch` calls fail or succeed.
    pub fn fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::backend(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        Self::check(&self.fail_gets, "get")?;
        self.inner.get(key).await
    }

    async fn put(&self, key: Bytes, value: Bytes, options: PutOptions) -> StoreResult<()> {
        Self::check(&self.fail_puts, "put")?;
        self.inner.put(key, value, options).await
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        Self::check(&self.fail_dels, "del")?;
        self.inner.del(key).await
    }

    async fn batch(&self, ops: Vec<BatchOp>, options: BatchOptions) -> StoreResult<()> {
        Self::check(&self.fail_batches, "batch")?;
        self.inner.batch(ops, options).await
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        Ok(ChainedBatch::new(self))
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

/// Store whose completions can be held until released.
///
/// A held `get` reads the stored value first, then waits; a held `put`
/// waits first, then writes. Each held call consumes one released permit,
/// in the order the calls started waiting. Whether a call is held is decided
/// when it starts.
#[derive(Debug)]
pub struct GatedStore<S = MemoryStore> {
    inner: S,
    gate: Semaphore,
    hold_gets: AtomicBool,
    hold_puts: AtomicBool,
    waiting: AtomicUsize,
}

impl Default for GatedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GatedStore {
    /// Gate a fresh [`MemoryStore`] with no calls held.
    pub fn new() -> Self {
        Self::with_inner(MemoryStore::new())
    }
}

impl<S: KeyValueStore> GatedStore<S> {
    /// Gate `inner` with no calls held.
    pub fn with_inner(inner: S) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
            hold_gets: AtomicBool::new(false),
            hold_puts: AtomicBool::new(false),
            waiting: AtomicUsize::new(0),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Hold `get` completions until released.
    pub fn hold_gets(&self, hold: bool) {
        self.hold_gets.store(hold, Ordering::SeqCst);
    }

    /// Hold `put` completions until released.
    pub fn hold_puts(&self, hold: bool) {
        self.hold_puts.store(hold, Ordering::SeqCst);
    }

    /// Let `n` held calls complete.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Number of calls currently held.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Yield until at least `n` calls are held.
    pub async fn until_waiting(&self, n: usize) {
        while self.waiting() < n {
            tokio::task::yield_now().await;
        }
    }

    async fn wait(&self, flag: &AtomicBool) -> StoreResult<()> {
        if !flag.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        permit.map_err(StoreError::backend)?.forget();
        Ok(())
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for GatedStore<S> {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        let value = self.inner.get(key).await?;
        self.wait(&self.hold_gets).await?;
        Ok(value)
    }

    async fn put(&self, key: Bytes, value: Bytes, options: PutOptions) -> StoreResult<()> {
        self.wait(&self.hold_puts).await?;
        self.inner.put(key, value, options).await
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        self.inner.del(key).await
    }

    async fn batch(&self, ops: Vec<BatchOp>, options: BatchOptions) -> StoreResult<()> {
        self.inner.batch(ops, options).await
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        Ok(ChainedBatch::new(self))
    }

    async fn close(&self) -> StoreResult<()> {
        self.gate.close();
        self.inner.close().await
    }
}

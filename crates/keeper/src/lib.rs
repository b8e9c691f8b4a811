//! Content-addressed, signature-validated, cache-accelerated record keeper.
//!
//! A keeper stack is built from layers that each implement
//! [`KeyValueStore`] and only talk to the layer below:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ CachedKeeper                                │
//! │   LRU cache, speculative writes, rollback   │
//! ├─────────────────────────────────────────────┤
//! │ ValidatingKeeper                            │
//! │   key == link(value), signature checks      │
//! ├─────────────────────────────────────────────┤
//! │ EncryptedStore (optional)                   │
//! │   hashed keys, AES-256-GCM values           │
//! ├─────────────────────────────────────────────┤
//! │ MemoryStore / RedbStore                     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! [`open`] composes the full stack from [`KeeperArgs`]; [`init_logging`]
//! installs logging from its `log` section.

#![warn(missing_docs)]

pub mod args;
mod cache;
mod cached;
pub mod config;
mod metrics;
mod validating;

pub use args::{ArgsError, CacheArgs, EncryptionArgs, KeeperArgs};
pub use cache::{CacheStats, RecordCache};
pub use cached::CachedKeeper;
pub use config::{CacheOptions, RecordCacheConfig};
pub use validating::ValidatingKeeper;

pub use keeper_observability::{LogArgs, init_logging};
pub use keeper_store::{
    BatchOp, BatchOptions, Bytes, ChainedBatch, KeyValueStore, PutOptions, Record, StoreError,
    StoreResult,
};

use std::sync::Arc;

use async_trait::async_trait;
use keeper_encryption::EncryptedStore;
use keeper_store::MemoryStore;
use keeper_store_redb::RedbStore;
use tracing::{debug, info};

/// A type-erased keeper stack.
#[derive(Clone)]
pub struct Keeper {
    store: Arc<dyn KeyValueStore>,
    cache: Option<Arc<RecordCache>>,
}

impl Keeper {
    /// Wrap any store as a keeper handle.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, cache: None }
    }

    /// Get cache statistics, if the stack has a cache.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }
}

impl core::fmt::Debug for Keeper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Keeper")
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyValueStore for Keeper {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.store.get(key).await
    }

    async fn put(&self, key: Bytes, value: Bytes, options: PutOptions) -> StoreResult<()> {
        self.store.put(key, value, options).await
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        self.store.del(key).await
    }

    async fn batch(&self, ops: Vec<BatchOp>, options: BatchOptions) -> StoreResult<()> {
        self.store.batch(ops, options).await
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        self.store.chained_batch()
    }

    async fn close(&self) -> StoreResult<()> {
        self.store.close().await
    }
}

/// Open a keeper stack as configured by `args`.
///
/// Without a data directory, or with `--db.memory`, records live in memory.
pub fn open(args: &KeeperArgs) -> StoreResult<Keeper> {
    let mut store: Arc<dyn KeyValueStore> = match args.database_path() {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).map_err(StoreError::backend)?;
            }
            Arc::new(RedbStore::open(&path)?)
        }
        None => {
            debug!("Using in-memory record store");
            Arc::new(MemoryStore::new())
        }
    };

    if let Some(config) = args.encryption.config()? {
        debug!("Encrypting records at rest");
        store = Arc::new(EncryptedStore::new(store, &config)?);
    }

    let store = ValidatingKeeper::new(store).with_validate_on_put(args.validate_on_put);

    let keeper = if args.cache.disabled {
        Keeper::new(Arc::new(store))
    } else {
        let options = CacheOptions::from_config(&args.cache);
        debug!(?options, "Caching records");
        let cached = CachedKeeper::new(store, &options);
        let cache = Arc::clone(cached.cache());
        Keeper {
            store: Arc::new(cached),
            cache: Some(cache),
        }
    };

    info!(
        path = ?args.database_path(),
        validate_on_put = args.validate_on_put,
        cached = keeper.cache.is_some(),
        "Opened keeper"
    );
    Ok(keeper)
}

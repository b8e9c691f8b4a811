//! redb-based record storage backend.
//!
//! This crate provides [`RedbStore`], a persistent ordered key-value store
//! backed by the redb embedded database.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use keeper_store::{
    BatchOp, BatchOptions, Bytes, ChainedBatch, KeyValueStore, PutOptions, StoreError,
    StoreResult,
};
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

/// Table definition for records.
/// Key: record key bytes
/// Value: record value bytes
const RECORDS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

/// Errors from the redb backend.
#[derive(Debug, thiserror::Error)]
pub enum RedbError {
    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),
}

impl From<redb::DatabaseError> for RedbError {
    fn from(err: redb::DatabaseError) -> Self {
        RedbError::Database(err.to_string())
    }
}

impl From<redb::TransactionError> for RedbError {
    fn from(err: redb::TransactionError) -> Self {
        RedbError::Database(err.to_string())
    }
}

impl From<redb::TableError> for RedbError {
    fn from(err: redb::TableError) -> Self {
        RedbError::Database(err.to_string())
    }
}

impl From<redb::StorageError> for RedbError {
    fn from(err: redb::StorageError) -> Self {
        RedbError::Database(err.to_string())
    }
}

impl From<redb::CommitError> for RedbError {
    fn from(err: redb::CommitError) -> Self {
        RedbError::Database(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RedbError {
    fn from(err: tokio::task::JoinError) -> Self {
        RedbError::Task(err.to_string())
    }
}

impl From<RedbError> for StoreError {
    fn from(err: RedbError) -> Self {
        StoreError::backend(err)
    }
}

/// redb-based record store.
///
/// Uses redb for ACID-compliant persistent storage. Every transaction runs on
/// the blocking thread pool; a batch is a single write transaction.
pub struct RedbStore {
    db: RwLock<Option<Arc<Database>>>,
}

impl RedbStore {
    /// Open or create a record store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RedbError> {
        let db = Database::create(path.as_ref())?;

        // Ensure the records table exists
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS_TABLE)?;
        }
        write_txn.commit()?;

        debug!(path = %path.as_ref().display(), "Opened redb record store");
        Ok(Self {
            db: RwLock::new(Some(Arc::new(db))),
        })
    }

    /// Count stored records.
    pub async fn count(&self) -> StoreResult<u64> {
        let db = self.handle()?;
        let count = tokio::task::spawn_blocking(move || -> Result<u64, RedbError> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(RECORDS_TABLE)?;
            // Count by iterating
            let mut count = 0u64;
            for entry in table.iter()? {
                entry?;
                count += 1;
            }
            Ok(count)
        })
        .await
        .map_err(RedbError::from)??;
        Ok(count)
    }

    fn handle(&self) -> Result<Arc<Database>, RedbError> {
        self.db.read().clone().ok_or(RedbError::Closed)
    }
}

#[async_trait]
impl KeyValueStore for RedbStore {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        let db = self.handle()?;
        let key = key.to_vec();
        let value = tokio::task::spawn_blocking(move || -> Result<Option<Bytes>, RedbError> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(RECORDS_TABLE)?;
            match table.get(key.as_slice())? {
                Some(value) => Ok(Some(Bytes::copy_from_slice(value.value()))),
                None => Ok(None),
            }
        })
        .await
        .map_err(RedbError::from)??;
        Ok(value)
    }

    async fn put(&self, key: Bytes, value: Bytes, _options: PutOptions) -> StoreResult<()> {
        let db = self.handle()?;
        tokio::task::spawn_blocking(move || -> Result<(), RedbError> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(RECORDS_TABLE)?;
                table.insert(key.as_ref(), value.as_ref())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
        .map_err(RedbError::from)??;
        Ok(())
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        let db = self.handle()?;
        let key = key.to_vec();
        tokio::task::spawn_blocking(move || -> Result<(), RedbError> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(RECORDS_TABLE)?;
                table.remove(key.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
        .map_err(RedbError::from)??;
        Ok(())
    }

    async fn batch(&self, ops: Vec<BatchOp>, _options: BatchOptions) -> StoreResult<()> {
        let db = self.handle()?;
        let len = ops.len();
        tokio::task::spawn_blocking(move || -> Result<(), RedbError> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(RECORDS_TABLE)?;
                for op in &ops {
                    match op {
                        BatchOp::Put { key, value, .. } => {
                            table.insert(key.as_ref(), value.as_ref())?;
                        }
                        BatchOp::Del { key } => {
                            table.remove(key.as_ref())?;
                        }
                    }
                }
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
        .map_err(RedbError::from)??;
        debug!(ops = len, "Committed batch");
        Ok(())
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        self.handle()?;
        Ok(ChainedBatch::new(self))
    }

    async fn close(&self) -> StoreResult<()> {
        if self.db.write().take().is_some() {
            debug!("Closed redb record store");
        }
        Ok(())
    }
}

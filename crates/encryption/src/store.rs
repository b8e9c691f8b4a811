//! Store wrapper encrypting values and hashing keys.

use async_trait::async_trait;
use bytes::Bytes;
use keeper_store::{
    BatchOp, BatchOptions, ChainedBatch, KeyValueStore, PutOptions, StoreResult,
};
use tracing::trace;

use crate::{EncryptionConfig, EncryptionError, RecordCipher};

/// A [`KeyValueStore`] whose stored keys are hashed and values encrypted.
#[derive(Debug)]
pub struct EncryptedStore<S> {
    inner: S,
    cipher: RecordCipher,
}

impl<S: KeyValueStore> EncryptedStore<S> {
    /// Wrap `inner` with keys derived from `config`.
    pub fn new(inner: S, config: &EncryptionConfig) -> Result<Self, EncryptionError> {
        Ok(Self {
            inner,
            cipher: RecordCipher::new(config)?,
        })
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn encrypt_op(&self, op: BatchOp) -> Result<BatchOp, EncryptionError> {
        Ok(match op {
            BatchOp::Put {
                key,
                value,
                validate,
            } => BatchOp::Put {
                value: self.cipher.seal(&key, &value)?,
                key: self.cipher.hash_key(&key),
                validate,
            },
            BatchOp::Del { key } => BatchOp::Del {
                key: self.cipher.hash_key(&key),
            },
        })
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for EncryptedStore<S> {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        let Some(sealed) = self.inner.get(&self.cipher.hash_key(key)).await? else {
            return Ok(None);
        };
        trace!(len = sealed.len(), "Decrypting value");
        Ok(Some(self.cipher.open(key, &sealed)?))
    }

    async fn put(&self, key: Bytes, value: Bytes, options: PutOptions) -> StoreResult<()> {
        let sealed = self.cipher.seal(&key, &value)?;
        self.inner
            .put(self.cipher.hash_key(&key), sealed, options)
            .await
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        self.inner.del(&self.cipher.hash_key(key)).await
    }

    async fn batch(&self, ops: Vec<BatchOp>, options: BatchOptions) -> StoreResult<()> {
        let ops = ops
            .into_iter()
            .map(|op| self.encrypt_op(op))
            .collect::<Result<Vec<_>, _>>()?;
        self.inner.batch(ops, options).await
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        Ok(ChainedBatch::new(self))
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_store::{MemoryStore, StoreError};
    use std::sync::Arc;

    fn encrypted(config: &EncryptionConfig) -> (Arc<MemoryStore>, EncryptedStore<Arc<MemoryStore>>) {
        let raw = Arc::new(MemoryStore::new());
        let store = EncryptedStore::new(Arc::clone(&raw), config).unwrap();
        (raw, store)
    }

    #[tokio::test]
    async fn test_raw_key_is_never_stored() {
        let (raw, store) = encrypted(&EncryptionConfig::password("correct horse"));

        store
            .put(
                Bytes::from_static(b"hello"),
                Bytes::from_static(b"world"),
                PutOptions::default(),
            )
            .await
            .unwrap();

        assert!(!raw.contains(b"hello"));
        assert_eq!(raw.len(), 1);
        let stored_key = &raw.keys()[0];
        assert_eq!(stored_key.len(), 32);

        let stored_value = raw.get(stored_key).await.unwrap().unwrap();
        assert!(!stored_value.windows(5).any(|w| w == b"world"));

        assert_eq!(
            store.get(b"hello").await.unwrap(),
            Some(Bytes::from_static(b"world"))
        );
    }

    #[tokio::test]
    async fn test_wrong_key_material_fails_reads() {
        let raw = Arc::new(MemoryStore::new());
        let writer =
            EncryptedStore::new(Arc::clone(&raw), &EncryptionConfig::key([1; 32])).unwrap();
        writer
            .put(
                Bytes::from_static(b"k"),
                Bytes::from_static(b"v"),
                PutOptions::default(),
            )
            .await
            .unwrap();

        // Different key material hashes keys differently, so the record is invisible
        let reader =
            EncryptedStore::new(Arc::clone(&raw), &EncryptionConfig::key([2; 32])).unwrap();
        assert_eq!(reader.get(b"k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tampered_value_is_backend_error() {
        let (raw, store) = encrypted(&EncryptionConfig::key([3; 32]));
        store
            .put(
                Bytes::from_static(b"k"),
                Bytes::from_static(b"v"),
                PutOptions::default(),
            )
            .await
            .unwrap();

        let stored_key = raw.keys()[0].clone();
        raw.put(stored_key, Bytes::from_static(b"garbage"), PutOptions::default())
            .await
            .unwrap();

        let err = store.get(b"k").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_batch_and_delete() {
        let (raw, store) = encrypted(&EncryptionConfig::key([4; 32]));

        store
            .batch(
                vec![BatchOp::put("a", "1"), BatchOp::put("b", "2")],
                BatchOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(raw.len(), 2);

        store
            .chained_batch()
            .unwrap()
            .del("a")
            .write()
            .await
            .unwrap();
        store.del(b"b").await.unwrap();

        assert!(raw.is_empty());
        assert_eq!(store.get(b"a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_delegates() {
        let (raw, store) = encrypted(&EncryptionConfig::key([5; 32]));
        store.close().await.unwrap();
        assert!(raw.get(b"anything").await.is_err());
    }
}

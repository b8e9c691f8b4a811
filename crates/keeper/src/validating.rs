//! Content-addressing and signature validation on the write path.

use async_trait::async_trait;
use bytes::Bytes;
use keeper_crypto::{EcdsaRecordCrypto, RecordCrypto};
use keeper_store::{
    BatchOp, BatchOptions, ChainedBatch, KeyValueStore, PutOptions, StoreError, StoreResult,
};
use tracing::{debug, warn};

/// A keeper that only lets valid records reach its inner store.
///
/// A record is valid when its key is the content link of its value and the
/// value carries a valid signature. Reads and deletes pass straight through.
#[derive(Debug)]
pub struct ValidatingKeeper<S, C = EcdsaRecordCrypto> {
    inner: S,
    crypto: C,
    validate_on_put: bool,
}

impl<S: KeyValueStore> ValidatingKeeper<S> {
    /// Wrap `inner` with the default crypto, validating every put.
    pub fn new(inner: S) -> Self {
        Self::with_crypto(inner, EcdsaRecordCrypto)
    }
}

impl<S: KeyValueStore, C: RecordCrypto> ValidatingKeeper<S, C> {
    /// Wrap `inner` with a custom crypto collaborator.
    pub fn with_crypto(inner: S, crypto: C) -> Self {
        Self {
            inner,
            crypto,
            validate_on_put: true,
        }
    }

    /// Set whether puts are validated when the call doesn't say.
    pub fn with_validate_on_put(mut self, enabled: bool) -> Self {
        self.validate_on_put = enabled;
        self
    }

    /// Whether puts are validated by default.
    pub fn validate_on_put(&self) -> bool {
        self.validate_on_put
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Check a record against the content link and signature rules.
    pub fn check(&self, key: &Bytes, value: &[u8]) -> StoreResult<()> {
        if self.crypto.link(value) != *key {
            warn!(key = %hex::encode(key), "Rejected record: key is not the content link");
            return Err(StoreError::InvalidKey { key: key.clone() });
        }
        if !self.crypto.verify_signature(value) {
            let sig = self.crypto.signature(value);
            warn!(key = %hex::encode(key), sig = %hex::encode(&sig), "Rejected record: bad signature");
            return Err(StoreError::InvalidSignature { sig });
        }
        Ok(())
    }

    fn should_validate(&self, overrides: &[Option<bool>]) -> bool {
        overrides
            .iter()
            .find_map(|o| *o)
            .unwrap_or(self.validate_on_put)
    }
}

#[async_trait]
impl<S: KeyValueStore, C: RecordCrypto> KeyValueStore for ValidatingKeeper<S, C> {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: Bytes, value: Bytes, options: PutOptions) -> StoreResult<()> {
        if self.should_validate(&[options.validate]) {
            self.check(&key, &value)?;
        }
        self.inner.put(key, value, options).await
    }

    async fn del(&self, key: &[u8]) -> StoreResult<()> {
        self.inner.del(key).await
    }

    async fn batch(&self, ops: Vec<BatchOp>, options: BatchOptions) -> StoreResult<()> {
        for op in &ops {
            if let BatchOp::Put {
                key,
                value,
                validate,
            } = op
            {
                if self.should_validate(&[*validate, options.validate]) {
                    self.check(key, value)?;
                }
            }
        }
        debug!(ops = ops.len(), "Forwarding validated batch");
        self.inner.batch(ops, options).await
    }

    fn chained_batch(&self) -> StoreResult<ChainedBatch<'_>> {
        Err(StoreError::UnsupportedUsage {
            reason: "chained batch not supported",
        })
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

//! Full stacks built by `keeper::open` and by hand.

use std::sync::Arc;

use keeper::{
    BatchOptions, Bytes, CacheOptions, CachedKeeper, KeeperArgs, KeyValueStore, PutOptions,
    StoreError, ValidatingKeeper,
};
use keeper_encryption::{EncryptedStore, EncryptionConfig};
use keeper_store::MemoryStore;
use keeper_test_utils::{signed_record, tampered_record};
use tempfile::tempdir;

#[tokio::test]
async fn test_open_in_memory() {
    let keeper = keeper::open(&KeeperArgs::default()).unwrap();
    let record = signed_record(b"payload");

    keeper
        .put(record.key.clone(), record.value.clone(), PutOptions::default())
        .await
        .unwrap();
    assert_eq!(keeper.get(&record.key).await.unwrap(), Some(record.value));

    let bad = tampered_record(b"payload");
    assert!(matches!(
        keeper
            .put(bad.key, bad.value, PutOptions::default())
            .await
            .unwrap_err(),
        StoreError::InvalidSignature { .. }
    ));

    let stats = keeper.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert!(keeper.chained_batch().is_err());
}

#[tokio::test]
async fn test_open_without_cache() {
    let mut args = KeeperArgs::default();
    args.cache.disabled = true;
    args.validate_on_put = false;

    let keeper = keeper::open(&args).unwrap();
    assert!(keeper.cache_stats().is_none());

    keeper
        .put(
            Bytes::from_static(b"anything"),
            Bytes::from_static(b"goes"),
            PutOptions::default(),
        )
        .await
        .unwrap();
    // Chained batches are still rejected by the validating layer
    assert!(matches!(
        keeper.chained_batch(),
        Err(StoreError::UnsupportedUsage { .. })
    ));
}

#[tokio::test]
async fn test_redb_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let mut args = KeeperArgs {
        datadir: Some(dir.path().join("data")),
        ..Default::default()
    };
    args.encryption.key = Some("11".repeat(32));
    let record = signed_record(b"durable");

    {
        let keeper = keeper::open(&args).unwrap();
        keeper
            .batch(vec![record.clone().into_put()], BatchOptions::default())
            .await
            .unwrap();
        keeper.close().await.unwrap();
        assert!(keeper.get(&record.key).await.is_err());
    }

    let keeper = keeper::open(&args).unwrap();
    assert_eq!(keeper.get(&record.key).await.unwrap(), Some(record.value.clone()));

    // Another key cannot read the records
    drop(keeper);
    args.encryption.key = Some("22".repeat(32));
    let other = keeper::open(&args).unwrap();
    assert_eq!(other.get(&record.key).await.unwrap(), None);
}

#[tokio::test]
async fn test_encryption_hides_raw_keys() {
    let raw = Arc::new(MemoryStore::new());
    let keeper = CachedKeeper::new(
        ValidatingKeeper::new(
            EncryptedStore::new(Arc::clone(&raw), &EncryptionConfig::password("pw")).unwrap(),
        ),
        &CacheOptions::default(),
    );
    let record = signed_record(b"secret payload");

    keeper
        .put(record.key.clone(), record.value.clone(), PutOptions::default())
        .await
        .unwrap();

    assert_eq!(raw.len(), 1);
    assert!(!raw.contains(&record.key));
    let stored = raw.get(&raw.keys()[0]).await.unwrap().unwrap();
    assert_ne!(stored, record.value);

    // Read back past the cache
    keeper.cache().clear();
    assert_eq!(keeper.get(&record.key).await.unwrap(), Some(record.value));
}

//! Key-value capability interface for keeper stacks.
//!
//! This crate provides the pieces every layer shares:
//! - [`KeyValueStore`] - the get/put/del/batch/close interface
//! - [`Record`], [`BatchOp`], [`PutOptions`], [`BatchOptions`] - the data model
//! - [`ChainedBatch`] - incrementally built batches for backends that allow them
//! - [`StoreError`] - the error taxonomy
//! - [`MemoryStore`] - an ordered in-memory backend
//!
//! # Architecture
//!
//! ```text
//! caller
//! └── CachedKeeper       (LRU cache, speculative writes, rollback)
//!     └── ValidatingKeeper   (content link + signature checks)
//!         └── EncryptedStore     (value encryption, key hashing)
//!             └── backend            (MemoryStore / RedbStore)
//! ```

#![warn(missing_docs)]

mod error;
mod memory;
mod traits;
mod types;

pub use error::{ErrorKind, ErrorWire, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use traits::{ChainedBatch, KeyValueStore};
pub use types::{BatchOp, BatchOpKind, BatchOptions, PutOptions, Record};

pub use bytes::Bytes;

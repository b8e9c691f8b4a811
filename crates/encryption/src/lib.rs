//! Transparent encryption for keeper backends.
//!
//! [`EncryptedStore`] wraps any [`KeyValueStore`](keeper_store::KeyValueStore)
//! and preserves its interface:
//!
//! - stored key: `SHA-256(key secret | key)`, so raw keys never reach storage
//! - stored value: `nonce (12 bytes) | AES-256-GCM ciphertext`, with the
//!   caller's key bound as associated data
//!
//! Both secrets are expanded with HKDF-SHA256 from an [`EncryptionConfig`].
//! Passwords are first stretched with scrypt into the HKDF input.

#![warn(missing_docs)]

mod cipher;
mod config;
mod error;
mod store;

pub use cipher::{NONCE_SIZE, RecordCipher};
pub use config::{EncryptionConfig, SCRYPT_LOG_N, SCRYPT_P, SCRYPT_R, scrypt_derive_key};
pub use error::EncryptionError;
pub use store::EncryptedStore;

//! Content links and record signatures.
//!
//! A validating keeper accepts a record only when its key is the content link
//! of its value and the value carries a valid signature. This crate provides
//! the [`RecordCrypto`] collaborator trait and its default implementation,
//! [`EcdsaRecordCrypto`]:
//!
//! ```text
//! key   = keccak256(value)
//! value = address (20) | signature (65, r|s|v) | payload
//! ```
//!
//! The signature is an EIP-191 personal-message signature over `payload`,
//! and `address` is the signer it must recover to.

#![warn(missing_docs)]

mod envelope;
mod error;
mod signer;

pub use envelope::{ADDRESS_SIZE, HEADER_SIZE, SIGNATURE_SIZE, SignedEnvelope};
pub use error::CryptoError;
pub use signer::RecordSigner;

use alloy_primitives::keccak256;
use bytes::Bytes;

/// Cryptographic collaborator consumed by a validating keeper.
///
/// Implementations must be deterministic and must not perform I/O.
pub trait RecordCrypto: Send + Sync {
    /// Compute the content link of `value`.
    fn link(&self, value: &[u8]) -> Bytes;

    /// Returns true if `value` carries a valid embedded signature.
    fn verify_signature(&self, value: &[u8]) -> bool;

    /// Extract the signature field of `value`, or empty bytes if it has none.
    fn signature(&self, value: &[u8]) -> Bytes;
}

/// keccak-256 content links over secp256k1 signed envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaRecordCrypto;

impl EcdsaRecordCrypto {
    /// Create the default collaborator.
    pub fn new() -> Self {
        Self
    }
}

impl RecordCrypto for EcdsaRecordCrypto {
    fn link(&self, value: &[u8]) -> Bytes {
        Bytes::copy_from_slice(keccak256(value).as_slice())
    }

    fn verify_signature(&self, value: &[u8]) -> bool {
        SignedEnvelope::parse(value).is_ok_and(|envelope| envelope.verify().is_ok())
    }

    fn signature(&self, value: &[u8]) -> Bytes {
        SignedEnvelope::signature_field(value)
            .map(Bytes::copy_from_slice)
            .unwrap_or_default()
    }
}

//! Error types for record signing and verification.

use alloy_primitives::Address;
use keeper_store::StoreError;

/// Errors from signing or verifying records.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The value is too short to hold an envelope header.
    #[error("envelope too short: {len} bytes, need at least {min}")]
    EnvelopeTooShort {
        /// Actual length.
        len: usize,
        /// Minimum length.
        min: usize,
    },

    /// The signature bytes do not decode.
    #[error("malformed signature: {0}")]
    MalformedSignature(#[from] alloy_primitives::SignatureError),

    /// The signature recovers to a different signer than the one embedded.
    #[error("signer mismatch: expected {expected}, recovered {recovered}")]
    SignerMismatch {
        /// Address embedded in the envelope.
        expected: Address,
        /// Address recovered from the signature.
        recovered: Address,
    },

    /// The secret key is not a valid secp256k1 scalar.
    #[error("invalid secret key: {0}")]
    InvalidSecret(String),

    /// The local signer failed.
    #[error("signer error: {0}")]
    Signer(#[from] alloy_signer::Error),
}

impl From<CryptoError> for StoreError {
    fn from(err: CryptoError) -> Self {
        StoreError::backend(err)
    }
}

//! Encryption error types.

use keeper_store::StoreError;

/// Errors from the encryption adapter.
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    /// HKDF could not expand the configured key material.
    #[error("key derivation failed")]
    KeyDerivation,

    /// A stored value is shorter than a nonce.
    #[error("encrypted value too short: {0} bytes")]
    TooShort(usize),

    /// Encrypting a value failed.
    #[error("encryption failed")]
    Encrypt,

    /// A stored value failed authentication.
    #[error("decryption failed")]
    Decrypt,
}

impl From<EncryptionError> for StoreError {
    fn from(err: EncryptionError) -> Self {
        StoreError::backend(err)
    }
}

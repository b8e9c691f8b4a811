//! Key hashing and value sealing.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use bytes::Bytes;
use hkdf::Hkdf;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::{EncryptionConfig, EncryptionError};

/// Size of the random nonce prefixed to every stored value.
pub const NONCE_SIZE: usize = 12;

/// Salt for HKDF when none is configured (domain separation)
const HKDF_SALT: &[u8] = b"keeper-encrypted-store-v1";

/// Info string for the value encryption key
const VALUE_KEY_INFO: &[u8] = b"keeper-value-encryption";

/// Info string for the key hashing secret
const KEY_SECRET_INFO: &[u8] = b"keeper-key-hashing";

/// Derived secrets for one encrypted store.
#[derive(Clone)]
pub struct RecordCipher {
    cipher: Aes256Gcm,
    key_secret: [u8; 32],
}

impl RecordCipher {
    /// Derive the value key and key-hashing secret from `config`.
    ///
    /// Passwords are stretched with scrypt first, so this is slow for
    /// [`EncryptionConfig::Password`].
    pub fn new(config: &EncryptionConfig) -> Result<Self, EncryptionError> {
        let salt = config.salt().unwrap_or(HKDF_SALT);
        let ikm = config.ikm(salt)?;
        let hk = Hkdf::<Sha256>::new(Some(salt), &ikm);

        let mut value_key = [0u8; 32];
        hk.expand(VALUE_KEY_INFO, &mut value_key)
            .map_err(|_| EncryptionError::KeyDerivation)?;

        let mut key_secret = [0u8; 32];
        hk.expand(KEY_SECRET_INFO, &mut key_secret)
            .map_err(|_| EncryptionError::KeyDerivation)?;

        Ok(Self {
            cipher: Aes256Gcm::new(&Key::<Aes256Gcm>::from(value_key)),
            key_secret,
        })
    }

    /// The storage key for a caller key.
    pub fn hash_key(&self, key: &[u8]) -> Bytes {
        let digest = Sha256::new()
            .chain_update(self.key_secret)
            .chain_update(key)
            .finalize();
        Bytes::copy_from_slice(&digest)
    }

    /// Encrypt `value`, binding it to `key`.
    ///
    /// Returns `nonce (12 bytes) || ciphertext (includes GCM tag)`.
    pub fn seal(&self, key: &[u8], value: &[u8]) -> Result<Bytes, EncryptionError> {
        let nonce_bytes: [u8; NONCE_SIZE] = rand::rng().random();
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: value,
                    aad: key,
                },
            )
            .map_err(|_| EncryptionError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(Bytes::from(sealed))
    }

    /// Decrypt a value produced by [`seal`](Self::seal) for the same `key`.
    pub fn open(&self, key: &[u8], sealed: &[u8]) -> Result<Bytes, EncryptionError> {
        if sealed.len() < NONCE_SIZE {
            return Err(EncryptionError::TooShort(sealed.len()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: key,
                },
            )
            .map_err(|_| EncryptionError::Decrypt)?;
        Ok(Bytes::from(plaintext))
    }
}

impl core::fmt::Debug for RecordCipher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrypt_derive_key;

    fn cipher() -> RecordCipher {
        RecordCipher::new(&EncryptionConfig::key([42; 32])).unwrap()
    }

    #[test]
    fn test_seal_open() {
        let cipher = cipher();
        let sealed = cipher.seal(b"key", b"hello keeper").unwrap();
        // nonce + plaintext + GCM tag
        assert_eq!(sealed.len(), NONCE_SIZE + 12 + 16);

        let opened = cipher.open(b"key", &sealed).unwrap();
        assert_eq!(opened.as_ref(), b"hello keeper");
    }

    #[test]
    fn test_value_is_bound_to_key() {
        let cipher = cipher();
        let sealed = cipher.seal(b"key", b"value").unwrap();
        assert!(matches!(
            cipher.open(b"other", &sealed),
            Err(EncryptionError::Decrypt)
        ));
    }

    #[test]
    fn test_short_value_fails() {
        assert!(matches!(
            cipher().open(b"key", &[0u8; 5]),
            Err(EncryptionError::TooShort(5))
        ));
    }

    #[test]
    fn test_salt_changes_key_hash() {
        let plain = cipher();
        let salted =
            RecordCipher::new(&EncryptionConfig::key([42; 32]).with_salt([9; 32])).unwrap();

        assert_eq!(plain.hash_key(b"k"), cipher().hash_key(b"k"));
        assert_ne!(plain.hash_key(b"k"), salted.hash_key(b"k"));
    }

    #[test]
    fn test_password_is_stretched_with_scrypt() {
        let cipher = RecordCipher::new(&EncryptionConfig::password("hunter2")).unwrap();

        let ikm = scrypt_derive_key(b"hunter2", HKDF_SALT).unwrap();
        let mut expected = [0u8; 32];
        Hkdf::<Sha256>::new(Some(HKDF_SALT), &ikm)
            .expand(KEY_SECRET_INFO, &mut expected)
            .unwrap();
        assert_eq!(cipher.key_secret, expected);

        // A bare HKDF over the password must not be the key schedule
        let mut unstretched = [0u8; 32];
        Hkdf::<Sha256>::new(Some(HKDF_SALT), b"hunter2")
            .expand(KEY_SECRET_INFO, &mut unstretched)
            .unwrap();
        assert_ne!(cipher.key_secret, unstretched);
    }

    #[test]
    fn test_password_salt_changes_derivation() {
        let salt = [5; 32];
        let salted =
            RecordCipher::new(&EncryptionConfig::password("hunter2").with_salt(salt)).unwrap();

        let ikm = scrypt_derive_key(b"hunter2", &salt).unwrap();
        let mut expected = [0u8; 32];
        Hkdf::<Sha256>::new(Some(salt.as_slice()), &ikm)
            .expand(KEY_SECRET_INFO, &mut expected)
            .unwrap();
        assert_eq!(salted.key_secret, expected);
    }
}

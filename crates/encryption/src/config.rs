//! Encryption key material.

use crate::EncryptionError;

/// scrypt cost parameter (log2 of N) for password-derived keys.
pub const SCRYPT_LOG_N: u8 = 15;

/// scrypt block size parameter.
pub const SCRYPT_R: u32 = 8;

/// scrypt parallelization parameter.
pub const SCRYPT_P: u32 = 1;

/// Key material for an [`EncryptedStore`](crate::EncryptedStore).
#[derive(Clone, PartialEq, Eq)]
pub enum EncryptionConfig {
    /// A raw 256-bit key with an optional salt.
    Key {
        /// Input key material.
        key: [u8; 32],
        /// HKDF salt. A fixed domain salt is used when absent.
        salt: Option<[u8; 32]>,
    },
    /// A password, stretched with scrypt into input key material.
    Password {
        /// The password.
        password: String,
        /// scrypt and HKDF salt. A fixed domain salt is used when absent.
        salt: Option<[u8; 32]>,
    },
}

impl EncryptionConfig {
    /// Key material from a raw key without salt.
    pub fn key(key: [u8; 32]) -> Self {
        Self::Key { key, salt: None }
    }

    /// Key material from a password without salt.
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password {
            password: password.into(),
            salt: None,
        }
    }

    /// Set the salt.
    pub fn with_salt(mut self, value: [u8; 32]) -> Self {
        match &mut self {
            Self::Key { salt, .. } | Self::Password { salt, .. } => *salt = Some(value),
        }
        self
    }

    /// The configured salt, if any.
    pub fn salt(&self) -> Option<&[u8]> {
        match self {
            Self::Key { salt, .. } | Self::Password { salt, .. } => {
                salt.as_ref().map(|s| s.as_slice())
            }
        }
    }

    /// Input key material for HKDF.
    ///
    /// Raw keys are used as is; passwords go through scrypt with `salt`.
    pub(crate) fn ikm(&self, salt: &[u8]) -> Result<[u8; 32], EncryptionError> {
        match self {
            Self::Key { key, .. } => Ok(*key),
            Self::Password { password, .. } => scrypt_derive_key(password.as_bytes(), salt),
        }
    }
}

/// Stretch a password into 32 bytes of key material.
pub fn scrypt_derive_key(password: &[u8], salt: &[u8]) -> Result<[u8; 32], EncryptionError> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, 32)
        .map_err(|_| EncryptionError::KeyDerivation)?;
    let mut output = [0u8; 32];
    scrypt::scrypt(password, salt, &params, &mut output)
        .map_err(|_| EncryptionError::KeyDerivation)?;
    Ok(output)
}

impl core::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (name, salt) = match self {
            Self::Key { salt, .. } => ("Key", salt),
            Self::Password { salt, .. } => ("Password", salt),
        };
        f.debug_struct(name)
            .field("secret", &"<redacted>")
            .field("salted", &salt.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let config = EncryptionConfig::password("hunter2");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("salted: false"));

        let config = EncryptionConfig::key([7; 32]).with_salt([1; 32]);
        let debug = format!("{config:?}");
        assert!(debug.contains("salted: true"));
        assert!(!debug.contains("7, 7"));
    }

    #[test]
    fn test_with_salt() {
        let config = EncryptionConfig::password("pw").with_salt([3; 32]);
        assert_eq!(config.salt(), Some(&[3u8; 32][..]));
        assert_eq!(EncryptionConfig::key([0; 32]).salt(), None);
    }
}

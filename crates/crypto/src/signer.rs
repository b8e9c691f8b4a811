//! Building signed records.

use alloy_primitives::{Address, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use keeper_store::Record;

use crate::{CryptoError, EcdsaRecordCrypto, RecordCrypto, SignedEnvelope};

/// Signs payloads into content-addressed records.
#[derive(Debug, Clone)]
pub struct RecordSigner {
    signer: PrivateKeySigner,
}

impl RecordSigner {
    /// Wrap an existing signer.
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Create a signer with a fresh random key.
    pub fn random() -> Self {
        Self::new(PrivateKeySigner::random())
    }

    /// Create a signer from a 32-byte secret key.
    pub fn from_secret(secret: &B256) -> Result<Self, CryptoError> {
        let signer = PrivateKeySigner::from_bytes(secret)
            .map_err(|e| CryptoError::InvalidSecret(e.to_string()))?;
        Ok(Self::new(signer))
    }

    /// The signer's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign `payload` and return the record keyed by its content link.
    pub fn sign(&self, payload: &[u8]) -> Result<Record, CryptoError> {
        let signature = self.signer.sign_message_sync(payload)?;
        let value = SignedEnvelope::encode(self.address(), &signature, payload);
        let key = EcdsaRecordCrypto.link(&value);
        Ok(Record { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_signed_record_is_valid() {
        let crypto = EcdsaRecordCrypto::new();
        let record = RecordSigner::random().sign(b"hello").unwrap();

        assert_eq!(record.key, crypto.link(&record.value));
        assert!(crypto.verify_signature(&record.value));
        assert_eq!(crypto.signature(&record.value).len(), 65);
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let crypto = EcdsaRecordCrypto::new();
        let record = RecordSigner::random().sign(b"hello").unwrap();

        let mut tampered = record.value.to_vec();
        if let Some(last) = tampered.last_mut() {
            *last ^= 0xff;
        }
        assert!(!crypto.verify_signature(&tampered));
    }

    #[test]
    fn test_from_secret_is_deterministic() {
        let secret = B256::repeat_byte(0x11);
        let a = RecordSigner::from_secret(&secret).unwrap();
        let b = RecordSigner::from_secret(&secret).unwrap();
        assert_eq!(a.address(), b.address());

        assert!(RecordSigner::from_secret(&B256::ZERO).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn proptest_any_payload_round_trips(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
            let crypto = EcdsaRecordCrypto::new();
            let record = RecordSigner::random().sign(&payload).unwrap();

            prop_assert!(crypto.verify_signature(&record.value));
            let envelope = SignedEnvelope::parse(&record.value).unwrap();
            prop_assert_eq!(envelope.payload(), &payload[..]);
        }
    }
}

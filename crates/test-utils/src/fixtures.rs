//! Signed record fixtures.

use alloy_primitives::B256;
use keeper_crypto::{EcdsaRecordCrypto, RecordCrypto, RecordSigner};
use keeper_store::Record;

/// A signer with a fixed secret key.
pub fn test_signer() -> RecordSigner {
    RecordSigner::from_secret(&B256::repeat_byte(0x42)).unwrap()
}

/// A correctly keyed and signed record over `payload`.
pub fn signed_record(payload: &[u8]) -> Record {
    test_signer().sign(payload).unwrap()
}

/// A record whose key is the content link of its value but whose signature
/// no longer matches the payload.
pub fn tampered_record(payload: &[u8]) -> Record {
    let record = signed_record(payload);
    let mut value = record.value.to_vec();
    match value.last_mut() {
        // Flip a payload byte
        Some(last) if !payload.is_empty() => *last ^= 0x01,
        _ => value.push(0x01),
    }
    let key = EcdsaRecordCrypto.link(&value);
    Record::new(key, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures() {
        let crypto = EcdsaRecordCrypto::new();

        let good = signed_record(b"payload");
        assert_eq!(good.key, crypto.link(&good.value));
        assert!(crypto.verify_signature(&good.value));

        for bad in [tampered_record(b"payload"), tampered_record(b"")] {
            assert_eq!(bad.key, crypto.link(&bad.value));
            assert!(!crypto.verify_signature(&bad.value));
        }
    }
}

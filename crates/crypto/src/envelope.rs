//! Signed record envelope.

use alloy_primitives::{Address, Signature};
use bytes::{Bytes, BytesMut};

use crate::CryptoError;

/// Size of the embedded signer address.
pub const ADDRESS_SIZE: usize = 20;

/// Size of the embedded signature (r, s, v).
pub const SIGNATURE_SIZE: usize = 65;

/// Size of the envelope header preceding the payload.
pub const HEADER_SIZE: usize = ADDRESS_SIZE + SIGNATURE_SIZE;

/// A parsed view over a signed record value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope<'a> {
    address: Address,
    signature: Signature,
    payload: &'a [u8],
}

impl<'a> SignedEnvelope<'a> {
    /// Parse `value` into its header fields and payload.
    pub fn parse(value: &'a [u8]) -> Result<Self, CryptoError> {
        if value.len() < HEADER_SIZE {
            return Err(CryptoError::EnvelopeTooShort {
                len: value.len(),
                min: HEADER_SIZE,
            });
        }
        let (address, rest) = value.split_at(ADDRESS_SIZE);
        let (signature, payload) = rest.split_at(SIGNATURE_SIZE);

        Ok(Self {
            address: Address::from_slice(address),
            signature: Signature::from_raw(signature)?,
            payload,
        })
    }

    /// The raw signature field of `value`, if it is long enough to have one.
    pub fn signature_field(value: &[u8]) -> Option<&[u8]> {
        value.get(ADDRESS_SIZE..HEADER_SIZE)
    }

    /// Encode an envelope from its parts.
    pub fn encode(address: Address, signature: &Signature, payload: &[u8]) -> Bytes {
        let mut value = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        value.extend_from_slice(address.as_slice());
        value.extend_from_slice(&signature.as_bytes());
        value.extend_from_slice(payload);
        value.freeze()
    }

    /// Check that the signature recovers to the embedded address.
    pub fn verify(&self) -> Result<(), CryptoError> {
        let recovered = self.signature.recover_address_from_msg(self.payload)?;
        if recovered != self.address {
            return Err(CryptoError::SignerMismatch {
                expected: self.address,
                recovered,
            });
        }
        Ok(())
    }

    /// The claimed signer.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The signed payload.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

//! Error taxonomy shared by every layer of a keeper stack.
//!
//! Validation errors ([`StoreError::InvalidKey`], [`StoreError::InvalidSignature`])
//! are produced locally before any write reaches storage. Backend errors are
//! opaque and passed through unchanged. [`StoreError::UnsupportedUsage`] signals
//! a programming error and is only ever returned synchronously.

use bytes::Bytes;

/// Errors from keeper operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The record key is not the content link of its value.
    #[error("invalid key {}", hex::encode(key))]
    InvalidKey {
        /// The key supplied by the caller.
        key: Bytes,
    },

    /// The record value does not carry a valid signature.
    #[error("invalid signature {}", hex::encode(sig))]
    InvalidSignature {
        /// The signature field extracted from the value.
        sig: Bytes,
    },

    /// The underlying store failed.
    #[error("backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// The caller used the interface in a way no layer supports.
    #[error("unsupported usage: {reason}")]
    UnsupportedUsage {
        /// What was attempted.
        reason: &'static str,
    },
}

impl StoreError {
    /// Create a backend error from anything displayable.
    pub fn backend(message: impl ToString) -> Self {
        Self::Backend {
            message: message.to_string(),
        }
    }

    /// The kind tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKey { .. } => ErrorKind::InvalidKey,
            Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::UnsupportedUsage { .. } => ErrorKind::UnsupportedUsage,
        }
    }

    /// Returns true for errors raised by content validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidKey { .. } | Self::InvalidSignature { .. })
    }

    /// Flatten into the wire shape `{kind, key?, sig?, message}`.
    pub fn to_wire(&self) -> ErrorWire {
        let (key, sig) = match self {
            Self::InvalidKey { key } => (Some(key.clone()), None),
            Self::InvalidSignature { sig } => (None, Some(sig.clone())),
            _ => (None, None),
        };
        ErrorWire {
            kind: self.kind(),
            key,
            sig,
            message: self.to_string(),
        }
    }
}

/// Kind tag carried by every [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    /// Key does not match the content link.
    InvalidKey,
    /// Signature verification failed.
    InvalidSignature,
    /// Opaque backend failure.
    Backend,
    /// Unsupported interface usage.
    UnsupportedUsage,
}

/// Serializable error shape for crossing process boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorWire {
    /// Error kind tag.
    pub kind: ErrorKind,
    /// Offending key, for [`ErrorKind::InvalidKey`].
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub key: Option<Bytes>,
    /// Offending signature, for [`ErrorKind::InvalidSignature`].
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub sig: Option<Bytes>,
    /// Human readable message.
    pub message: String,
}

/// Result type for keeper operations.
pub type StoreResult<T> = Result<T, StoreError>;

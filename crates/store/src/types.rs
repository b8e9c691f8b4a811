//! Records, batch operations and per-call options.

use bytes::Bytes;

/// A key/value pair as handed to a keeper.
///
/// For validated records `key` is the content link of `value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    /// Storage key.
    pub key: Bytes,
    /// Opaque value bytes.
    pub value: Bytes,
}

impl Record {
    /// Create a record.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Convert into a `put` batch entry.
    pub fn into_put(self) -> BatchOp {
        BatchOp::put(self.key, self.value)
    }
}

/// Options for a single `put`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Force validation on (`Some(true)`) or off (`Some(false)`) for this call.
    /// `None` defers to the keeper-wide setting.
    pub validate: Option<bool>,
}

impl PutOptions {
    /// Options that skip content validation.
    pub fn unvalidated() -> Self {
        Self {
            validate: Some(false),
        }
    }

    /// Options that force content validation.
    pub fn validated() -> Self {
        Self {
            validate: Some(true),
        }
    }
}

/// Options for a `batch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Batch-wide validation override; a per-entry override takes precedence.
    pub validate: Option<bool>,
}

/// Kind of a [`BatchOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BatchOpKind {
    /// Write a value.
    Put,
    /// Remove a key.
    Del,
}

/// One entry of a materialized batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Write `value` under `key`.
    Put {
        /// Storage key.
        key: Bytes,
        /// Value bytes.
        value: Bytes,
        /// Per-entry validation override.
        validate: Option<bool>,
    },
    /// Remove `key`.
    Del {
        /// Storage key.
        key: Bytes,
    },
}

impl BatchOp {
    /// A `put` entry with no validation override.
    pub fn put(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
            validate: None,
        }
    }

    /// A `del` entry.
    pub fn del(key: impl Into<Bytes>) -> Self {
        Self::Del { key: key.into() }
    }

    /// Set the validation override. No effect on `del` entries.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        if let Self::Put { validate, .. } = &mut self {
            *validate = Some(enabled);
        }
        self
    }

    /// The entry's key.
    pub fn key(&self) -> &Bytes {
        match self {
            Self::Put { key, .. } | Self::Del { key } => key,
        }
    }

    /// The entry's kind.
    pub fn kind(&self) -> BatchOpKind {
        match self {
            Self::Put { .. } => BatchOpKind::Put,
            Self::Del { .. } => BatchOpKind::Del,
        }
    }

    /// Returns true for `put` entries.
    pub fn is_put(&self) -> bool {
        matches!(self, Self::Put { .. })
    }
}

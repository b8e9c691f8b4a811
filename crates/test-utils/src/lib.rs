//! Test utilities for keeper crates.
//!
//! - [`RecordingStore`] - records every call made against an inner store
//! - [`FailingStore`] - in-memory store with switchable injected failures
//! - [`GatedStore`] - in-memory store whose completions can be held back
//! - [`fixtures`] - signed and tampered records

#![allow(clippy::unwrap_used)]

pub mod fixtures;
mod stores;

pub use fixtures::{signed_record, tampered_record, test_signer};
pub use stores::{FailingStore, GatedStore, RecordedOp, RecordingStore};

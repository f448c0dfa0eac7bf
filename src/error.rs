//! Error types for drumlib.
//!
//! Expected editing conditions (capacity, overlap, idempotent no-op) are
//! not errors — they are reported through `store::EditOutcome`. The
//! types here cover operations that must abort before mutating anything.

use thiserror::Error;

/// A structural operation that was refused outright.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("cannot delete the last remaining partition")]
    LastPartition,
    #[error("cannot delete the last remaining line")]
    LastLine,
    #[error("no partition at index {0}")]
    PartitionOutOfRange(usize),
    #[error("invalid time signature {top}/{bottom}")]
    InvalidTimeSignature { top: u8, bottom: u8 },
}

/// A persisted snapshot that could not be loaded. The whole snapshot is
/// rejected — no partial import.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

//! Error types for PSBT parsing, signing, and finalization.

use thiserror::Error;

use btck_primitives::PrimitivesError;
use btck_transaction::TransactionError;

/// Errors that can occur when working with partially signed transactions.
#[derive(Debug, Error)]
pub enum PsbtError {
    /// The encoded data violates the PSBT format.
    #[error("malformed psbt: {0}")]
    Malformed(String),

    /// The PSBT declares a format version this crate does not support.
    #[error("unsupported psbt version {0}")]
    VersionUnsupported(u32),

    /// An input lacks the signatures its spend template requires.
    #[error("input {input} lacks the signatures required to finalize")]
    InsufficientSignatures { input: usize },

    /// Extraction was attempted before every input was finalized.
    #[error("psbt is not fully finalized")]
    NotFinalized,

    /// An input or output index does not exist.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// An embedded transaction or output failed to decode.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// A primitive operation failed (hashing, keys, encoding).
    #[error(transparent)]
    Primitives(#[from] PrimitivesError),
}

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An input or output index does not exist in the transaction.
    #[error("index {index} out of range ({len} entries)")]
    IndexOutOfRange { index: usize, len: usize },
    /// An amount exceeded the maximum money supply or wrapped around.
    #[error("satoshi amount overflow")]
    Overflow,
    /// An error occurred while producing or applying a signature.
    #[error("signing error: {0}")]
    SigningError(String),
    /// An underlying primitives error (forwarded from `btck-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] btck_primitives::PrimitivesError),
}

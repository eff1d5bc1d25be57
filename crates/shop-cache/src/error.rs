//! Cache error types.

use thiserror::Error;

/// Errors from the store and from persisted values.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A value could not be encoded.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Failed to perform store operation.
    #[error("Store operation failed: {0}")]
    StoreError(String),

    /// Serialized envelope exceeds the configured size cap.
    #[error("Value for {key} is {attempted_bytes} bytes, cap is {max_bytes}")]
    TooLarge {
        key: String,
        attempted_bytes: usize,
        max_bytes: usize,
    },
}

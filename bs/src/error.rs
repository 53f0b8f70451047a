//! Store error types

use thiserror::Error;

use crate::backend::BackendError;
use crate::codec::CodecError;
use crate::options::ConfigError;

/// Errors returned by [`crate::BitStore`] operations
#[derive(Debug, Error)]
pub enum BitStoreError {
    #[error("Item index {index} out of range for {length} items")]
    OutOfRange { index: usize, length: usize },

    #[error("Wrong item size: expected {expected} bits, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Not binary data: {value:?}")]
    NotBinary { value: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl BitStoreError {
    /// Check if this is an index range error
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, BitStoreError::OutOfRange { .. })
    }

    /// Check if a value was rejected before touching the array
    pub fn is_invalid_value(&self) -> bool {
        matches!(
            self,
            BitStoreError::SizeMismatch { .. } | BitStoreError::NotBinary { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BitStoreError>;

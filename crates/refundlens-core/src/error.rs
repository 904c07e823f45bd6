//! Error types for refundlens core.

use thiserror::Error;

use crate::config::ConfigError;
use crate::lookup::LookupError;
use crate::storage::StorageError;

/// Core error type for refundlens operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Filing lookup errors
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),
}

/// Result type alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

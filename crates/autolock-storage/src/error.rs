use thiserror::Error;

/// Storage-specific error types for the Autolock controller.
///
/// These errors cover reading and writing the configuration and registry
/// files. None of them is fatal to a running controller: callers report them
/// and keep operating on what they already hold in memory.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File contents are not valid JSON for the expected shape
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration values are inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

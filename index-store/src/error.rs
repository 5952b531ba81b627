use thiserror::Error;

/// Errors that can occur during index store operations
#[derive(Debug, Error)]
pub enum IndexStoreError {
    /// Failed to initialize a store
    #[error("Failed to initialize store: {0}")]
    Initialization(String),

    /// Invalid input provided to a store operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failed to extract chunks from a document
    #[error("Extraction failed for {path}: {reason}")]
    Extraction { path: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

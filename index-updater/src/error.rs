use thiserror::Error;

/// Errors raised by the index-maintenance pipeline.
///
/// Configuration and diff errors propagate to the caller; apply and
/// verify errors are caught inside the executor and converted into a
/// rollback attempt, so they never escape `execute()`.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Rejected by `UpdaterConfig::validate` at construction.
    #[error("Invalid updater configuration: {0}")]
    InvalidConfig(String),

    /// Malformed chunk input to the differ. Fatal, no retry.
    #[error("Malformed diff input: {0}")]
    Diff(String),

    /// Embedding or store I/O failure during APPLY.
    #[error("Apply failed: {0}")]
    Apply(String),

    /// Post-apply consistency check failed.
    #[error("Verification failed: {0}")]
    Verify(String),

    /// Best-effort rollback failed; the file is left inconsistent and
    /// should be re-enqueued for a full reindex by a supervisor.
    #[error("Rollback failed: {0}")]
    Rollback(String),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] docqa_embeddings::EmbeddingError),

    /// Index store error
    #[error("Index store error: {0}")]
    Store(#[from] docqa_index_store::IndexStoreError),
}

pub type Result<T> = std::result::Result<T, UpdateError>;

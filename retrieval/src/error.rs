use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Index store error: {0}")]
    Store(#[from] docqa_index_store::IndexStoreError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] docqa_embeddings::EmbeddingError),

    #[error("Query too short: minimum {min} characters, got {actual}")]
    QueryTooShort { min: usize, actual: usize },

    #[error("Invalid retrieval configuration: {0}")]
    InvalidConfig(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Reranking error: {0}")]
    Reranking(String),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

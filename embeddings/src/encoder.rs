use crate::error::EmbeddingError;
use async_trait::async_trait;

/// Black-box text encoder consumed by the diff and update layers.
///
/// Implementations may be slow (model inference, remote calls); callers
/// treat a failure as an apply failure and do not retry here.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode a batch of texts into embedding vectors, one per input.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Dimension of the vectors this encoder produces.
    fn dimension(&self) -> usize;

    /// Encode a single text.
    async fn encode_single(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.encode(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingGeneration("No embedding generated".into()))
    }
}

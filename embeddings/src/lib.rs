//! # DocQA Embeddings
//!
//! Text embedding for the document index. Wraps the
//! Nomic-embed-text-v1.5 model via fastembed-rs and exposes the
//! [`Encoder`] trait that the index-maintenance and retrieval layers
//! consume, so tests and alternative backends can swap the model out.
//!
//! ## Features
//!
//! - Fast, local embedding generation using ONNX Runtime
//! - Batch processing support
//! - Configurable embedding dimensions (Matryoshka embeddings)
//! - A deterministic stub encoder for tests ([`testing::StubEncoder`])
//!
//! ## Example
//!
//! ```no_run
//! use docqa_embeddings::EmbeddingService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = EmbeddingService::new().await?;
//!     let texts = vec!["What is the refund policy?".to_string()];
//!     let embeddings = service.embed(texts)?;
//!     println!("Generated {} embeddings", embeddings.len());
//!     Ok(())
//! }
//! ```

mod encoder;
mod error;
mod service;
pub mod testing;

pub use encoder::Encoder;
pub use error::EmbeddingError;
pub use service::EmbeddingConfig;
pub use service::EmbeddingModelType;
pub use service::EmbeddingService;

/// Default embedding dimension for Nomic-embed-text-v1.5
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Compact embedding dimension (using Matryoshka truncation)
pub const COMPACT_EMBEDDING_DIM: usize = 256;

/// Cosine similarity between two vectors, 0.0 for degenerate inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 2.0, 3.0];
        let c = vec![-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &c) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[tokio::test]
    #[ignore] // Requires embedding model download
    async fn test_service_creation() {
        let result = EmbeddingService::new().await;
        assert!(result.is_ok(), "Failed to create embedding service");
    }

    #[tokio::test]
    #[ignore] // Requires embedding model download
    async fn test_basic_embedding() {
        let service = EmbeddingService::new().await.expect("service");
        let texts = vec!["test text".to_string()];
        let embeddings = service.embed(texts).expect("embed");

        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].len(), DEFAULT_EMBEDDING_DIM);
    }
}

//! Deterministic encoder for tests.
//!
//! Produces stable, content-dependent vectors without a model download so
//! diff, update, and retrieval logic can be exercised hermetically. Texts
//! sharing many tokens land close together in the stub space, which is
//! enough for threshold-based matching tests.

use crate::encoder::Encoder;
use crate::error::EmbeddingError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const STUB_DIM: usize = 64;

/// Encoder whose output depends only on token content.
///
/// Can be switched into a failing mode to simulate encoder outages.
#[derive(Default)]
pub struct StubEncoder {
    fail: AtomicBool,
    calls: AtomicUsize,
    texts_encoded: AtomicUsize,
}

impl StubEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `encode` call return an error.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Number of `encode` calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total number of texts encoded across all calls.
    pub fn texts_encoded(&self) -> usize {
        self.texts_encoded.load(Ordering::SeqCst)
    }

    fn embed_text(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; STUB_DIM];
        for token in text.split_whitespace() {
            let bucket = Self::token_hash(token) as usize % STUB_DIM;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn token_hash(token: &str) -> u64 {
        // FNV-1a, stable across platforms and runs.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}

#[async_trait]
impl Encoder for StubEncoder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::EmbeddingGeneration(
                "stub encoder set to fail".to_string(),
            ));
        }
        self.texts_encoded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        STUB_DIM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosine_similarity;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_stub_is_deterministic() {
        let encoder = StubEncoder::new();
        let texts = vec!["the quick brown fox".to_string()];
        let a = encoder.encode(&texts).await.expect("encode");
        let b = encoder.encode(&texts).await.expect("encode");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_similar_texts_score_higher() {
        let encoder = StubEncoder::new();
        let texts = vec![
            "refund policy for enterprise customers".to_string(),
            "refund policy for individual customers".to_string(),
            "kernel scheduler internals".to_string(),
        ];
        let vectors = encoder.encode(&texts).await.expect("encode");

        let close = cosine_similarity(&vectors[0], &vectors[1]);
        let far = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(close > far);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let encoder = StubEncoder::new();
        encoder.set_failing(true);
        let result = encoder.encode(&["text".to_string()]).await;
        assert!(result.is_err());

        encoder.set_failing(false);
        let result = encoder.encode(&["text".to_string()]).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_counters() {
        let encoder = StubEncoder::new();
        encoder
            .encode(&["a".to_string(), "b".to_string()])
            .await
            .expect("encode");
        assert_eq!(encoder.calls(), 1);
        assert_eq!(encoder.texts_encoded(), 2);
    }
}

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifier of a chunk, derived from its position in the source file.
///
/// Identity is `(file_path, chunk_index)`; content equality is by hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new(file_path: &str, chunk_index: usize) -> Self {
        Self(format!("{file_path}#{chunk_index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bounded span of extracted document text, the unit of embedding
/// and retrieval. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier (`"{file_path}#{chunk_index}"`)
    pub id: ChunkId,

    /// Path of the source document
    pub file_path: String,

    /// Position of this chunk within the document (0-indexed)
    pub chunk_index: usize,

    /// The extracted text
    pub text: String,

    /// SHA-256 digest of `text`, used for exact-match comparison
    pub content_hash: String,

    /// Embedding vector, present once the chunk has been encoded
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Create a chunk, computing its content hash.
    pub fn new(file_path: impl Into<String>, chunk_index: usize, text: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let text = text.into();
        Self {
            id: ChunkId::new(&file_path, chunk_index),
            content_hash: Self::hash_text(&text),
            file_path,
            chunk_index,
            text,
            embedding: None,
        }
    }

    /// Attach an embedding vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// SHA-256 hash of a chunk text.
    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Common currency between the semantic scorer, the keyword scorer,
/// and the fused output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredDocument {
    /// Identifier of the underlying chunk
    pub doc_id: ChunkId,

    /// Path of the source document
    pub file_path: String,

    /// Position of the chunk within the document
    pub chunk_index: usize,

    /// Chunk text
    pub text: String,

    /// Relevance score (interpretation depends on the scorer)
    pub score: f32,
}

impl ScoredDocument {
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            doc_id: chunk.id.clone(),
            file_path: chunk.file_path.clone(),
            chunk_index: chunk.chunk_index,
            text: chunk.text.clone(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_creation() {
        let chunk = Chunk::new("doc.pdf", 3, "some text");
        assert_eq!(chunk.file_path, "doc.pdf");
        assert_eq!(chunk.chunk_index, 3);
        assert_eq!(chunk.id.as_str(), "doc.pdf#3");
        assert!(chunk.embedding.is_none());
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = Chunk::new("a.pdf", 0, "identical text");
        let b = Chunk::new("b.pdf", 7, "identical text");
        assert_eq!(a.content_hash, b.content_hash);

        let c = Chunk::new("a.pdf", 0, "different text");
        assert_ne!(a.content_hash, c.content_hash);
    }

    #[test]
    fn test_with_embedding() {
        let chunk = Chunk::new("doc.pdf", 0, "text").with_embedding(vec![1.0, 2.0]);
        assert_eq!(chunk.embedding, Some(vec![1.0, 2.0]));
    }

    #[test]
    fn test_scored_document_from_chunk() {
        let chunk = Chunk::new("doc.pdf", 2, "text");
        let scored = ScoredDocument::from_chunk(&chunk, 0.8);
        assert_eq!(scored.doc_id, chunk.id);
        assert_eq!(scored.chunk_index, 2);
        assert_eq!(scored.score, 0.8);
    }
}

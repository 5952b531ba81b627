use crate::chunk::{Chunk, ChunkId, ScoredDocument};
use crate::error::IndexStoreError;
use docqa_embeddings::cosine_similarity;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Dimension of the embeddings
    pub embedding_dim: usize,

    /// Default number of results to return
    pub default_limit: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 768,
            default_limit: 10,
        }
    }
}

/// In-memory vector store with JSON persistence.
///
/// Holds embedded chunks and answers nearest-neighbour queries by
/// cosine similarity. Mutations are persisted to disk after each call;
/// a missing or corrupt file on startup means starting fresh.
pub struct VectorStore {
    db_path: PathBuf,
    config: VectorStoreConfig,
    chunks: Vec<Chunk>,
}

impl VectorStore {
    /// Open or create a vector store at the specified path.
    pub async fn new(db_path: &Path) -> Result<Self, IndexStoreError> {
        Self::with_config(db_path, VectorStoreConfig::default()).await
    }

    /// Open or create a vector store with custom configuration.
    pub async fn with_config(
        db_path: &Path,
        config: VectorStoreConfig,
    ) -> Result<Self, IndexStoreError> {
        info!("Initializing vector store at {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let chunks = if db_path.exists() {
            match Self::load_from_disk(db_path).await {
                Ok(data) => data,
                Err(e) => {
                    debug!("Could not load existing data: {e}, starting fresh");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        info!("Vector store initialized with {} chunks", chunks.len());
        Ok(Self {
            db_path: db_path.to_path_buf(),
            config,
            chunks,
        })
    }

    async fn load_from_disk(path: &Path) -> Result<Vec<Chunk>, IndexStoreError> {
        let content = tokio::fs::read(path).await?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&content)?;
        Ok(chunks)
    }

    async fn save_to_disk(&self) -> Result<(), IndexStoreError> {
        let content = serde_json::to_vec(&self.chunks)?;
        tokio::fs::write(&self.db_path, content).await?;
        Ok(())
    }

    /// Insert chunks with freshly computed embeddings.
    ///
    /// `chunks` and `embeddings` must have equal length.
    pub async fn insert(
        &mut self,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<(), IndexStoreError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexStoreError::InvalidInput(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let embedded = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| chunk.with_embedding(vector))
            .collect();
        self.insert_embedded(embedded).await
    }

    /// Insert chunks that already carry embeddings (e.g. a checkpoint
    /// being restored).
    pub async fn insert_embedded(&mut self, chunks: Vec<Chunk>) -> Result<(), IndexStoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        for chunk in &chunks {
            if chunk.embedding.is_none() {
                return Err(IndexStoreError::InvalidInput(format!(
                    "chunk {} has no embedding",
                    chunk.id
                )));
            }
        }

        debug!("Inserting {} chunks into vector store", chunks.len());
        self.chunks.extend(chunks);
        self.save_to_disk().await?;
        Ok(())
    }

    /// Remove every chunk belonging to a file. Returns the number removed.
    pub async fn remove_by_path(&mut self, file_path: &str) -> Result<usize, IndexStoreError> {
        let before = self.chunks.len();
        self.chunks.retain(|c| c.file_path != file_path);
        let removed = before - self.chunks.len();
        if removed > 0 {
            self.save_to_disk().await?;
        }
        debug!("Removed {removed} chunks for {file_path}");
        Ok(removed)
    }

    /// Remove chunks by id. Returns the number removed.
    pub async fn remove_ids(&mut self, ids: &[ChunkId]) -> Result<usize, IndexStoreError> {
        let before = self.chunks.len();
        self.chunks.retain(|c| !ids.contains(&c.id));
        let removed = before - self.chunks.len();
        if removed > 0 {
            self.save_to_disk().await?;
        }
        Ok(removed)
    }

    /// Nearest-neighbour search by cosine similarity.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<ScoredDocument> {
        let mut results: Vec<ScoredDocument> = self
            .chunks
            .iter()
            .map(|chunk| {
                let score = chunk
                    .embedding
                    .as_deref()
                    .map(|v| cosine_similarity(query_embedding, v))
                    .unwrap_or(0.0);
                ScoredDocument::from_chunk(chunk, score)
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        results
    }

    /// All chunks for a file, ordered by chunk index.
    pub fn get_chunks_by_path(&self, file_path: &str) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = self
            .chunks
            .iter()
            .filter(|c| c.file_path == file_path)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        chunks
    }

    /// Total number of chunks in the store.
    pub fn count(&self) -> usize {
        self.chunks.len()
    }

    /// Get the configuration of this vector store.
    pub fn config(&self) -> &VectorStoreConfig {
        &self.config
    }
}

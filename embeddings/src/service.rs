use crate::encoder::Encoder;
use crate::error::EmbeddingError;
use crate::{COMPACT_EMBEDDING_DIM, DEFAULT_EMBEDDING_DIM};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Configuration for the embedding service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model to use for embeddings
    pub model: EmbeddingModelType,

    /// Target embedding dimension (for Matryoshka truncation)
    pub dimension: usize,

    /// Maximum batch size for embedding generation
    pub batch_size: usize,

    /// Show download progress when downloading models
    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModelType::NomicEmbedTextV15,
            dimension: DEFAULT_EMBEDDING_DIM,
            batch_size: 32,
            show_download_progress: false,
        }
    }
}

/// Supported embedding models
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum EmbeddingModelType {
    /// Nomic-embed-text-v1.5 (recommended for documents)
    NomicEmbedTextV15,
    /// All-MiniLM-L6-v2 (lightweight, faster)
    AllMiniLmL6V2,
}

impl EmbeddingModelType {
    fn to_fastembed_model(self) -> EmbeddingModel {
        match self {
            EmbeddingModelType::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
            EmbeddingModelType::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
        }
    }
}

/// Service for generating text embeddings
pub struct EmbeddingService {
    model: TextEmbedding,
    config: EmbeddingConfig,
}

impl EmbeddingService {
    /// Create a new embedding service with default configuration
    pub async fn new() -> Result<Self, EmbeddingError> {
        Self::with_config(EmbeddingConfig::default()).await
    }

    /// Create a new embedding service with custom configuration
    pub async fn with_config(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        info!(
            "Initializing embedding service with model {:?}, dimension {}",
            config.model, config.dimension
        );

        let init_options = InitOptions::new(config.model.to_fastembed_model())
            .with_show_download_progress(config.show_download_progress);

        let model = TextEmbedding::try_new(init_options).map_err(|e| {
            EmbeddingError::ModelInitialization(format!("Failed to initialize model: {e}"))
        })?;

        info!("Embedding service initialized successfully");

        Ok(Self { model, config })
    }

    /// Create a compact embedding service (256 dimensions)
    pub async fn new_compact() -> Result<Self, EmbeddingError> {
        let config = EmbeddingConfig {
            dimension: COMPACT_EMBEDDING_DIM,
            ..Default::default()
        };
        Self::with_config(config).await
    }

    /// Generate embeddings for a list of texts
    pub fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let text_refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in text_refs.chunks(self.config.batch_size) {
            let batch_embeddings = self
                .model
                .embed(chunk.to_vec(), None)
                .map_err(|e| EmbeddingError::EmbeddingGeneration(e.to_string()))?;

            for mut embedding in batch_embeddings {
                // Truncate to target dimension if needed (Matryoshka)
                if embedding.len() > self.config.dimension {
                    embedding.truncate(self.config.dimension);
                }
                all_embeddings.push(embedding);
            }
        }

        debug!("Generated {} embeddings", all_embeddings.len());

        Ok(all_embeddings)
    }

    /// Generate a single embedding for a text
    pub fn embed_single(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.embed(vec![text.to_string()])?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingGeneration("No embedding generated".into()))
    }

    /// Get the dimension of embeddings produced by this service
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Get the configuration of this service
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[async_trait]
impl Encoder for EmbeddingService {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed(texts.to_vec())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

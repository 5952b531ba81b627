use serde::{Deserialize, Serialize};

/// Configuration for the index-maintenance pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Minimum text-similarity ratio for the differ's second pass
    #[serde(default = "default_text_similarity_threshold")]
    pub text_similarity_threshold: f32,

    /// Minimum cosine similarity for the differ's semantic pass
    #[serde(default = "default_semantic_similarity_threshold")]
    pub semantic_similarity_threshold: f32,

    /// Run the semantic pass (requires an encoder)
    #[serde(default = "default_true")]
    pub semantic_pass: bool,

    /// Below this chunk count a full reindex always wins
    #[serde(default = "default_min_chunks_for_incremental")]
    pub min_chunks_for_incremental: usize,

    /// Change ratio above which a full reindex is selected
    #[serde(default = "default_full_reindex_threshold")]
    pub full_reindex_threshold: f32,

    /// Change ratio below which a plain chunk update is selected
    #[serde(default = "default_chunk_update_threshold")]
    pub chunk_update_threshold: f32,

    /// Maximum number of pending tasks in the update queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Completed-task history ring capacity
    #[serde(default = "default_completed_history")]
    pub completed_history: usize,

    /// Failed-task history ring capacity
    #[serde(default = "default_failed_history")]
    pub failed_history: usize,
}

fn default_text_similarity_threshold() -> f32 {
    0.70
}

fn default_semantic_similarity_threshold() -> f32 {
    0.85
}

fn default_min_chunks_for_incremental() -> usize {
    10
}

fn default_full_reindex_threshold() -> f32 {
    0.5
}

fn default_chunk_update_threshold() -> f32 {
    0.2
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_completed_history() -> usize {
    100
}

fn default_failed_history() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            text_similarity_threshold: default_text_similarity_threshold(),
            semantic_similarity_threshold: default_semantic_similarity_threshold(),
            semantic_pass: true,
            min_chunks_for_incremental: default_min_chunks_for_incremental(),
            full_reindex_threshold: default_full_reindex_threshold(),
            chunk_update_threshold: default_chunk_update_threshold(),
            queue_capacity: default_queue_capacity(),
            completed_history: default_completed_history(),
            failed_history: default_failed_history(),
        }
    }
}

impl UpdaterConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.text_similarity_threshold) {
            return Err("text_similarity_threshold must be within [0, 1]".to_string());
        }

        if !(0.0..=1.0).contains(&self.semantic_similarity_threshold) {
            return Err("semantic_similarity_threshold must be within [0, 1]".to_string());
        }

        if self.chunk_update_threshold >= self.full_reindex_threshold {
            return Err(
                "chunk_update_threshold must be below full_reindex_threshold".to_string(),
            );
        }

        if self.queue_capacity == 0 {
            return Err("queue_capacity must be > 0".to_string());
        }

        if self.completed_history == 0 || self.failed_history == 0 {
            return Err("history capacities must be > 0".to_string());
        }

        Ok(())
    }
}

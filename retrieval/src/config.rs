use serde::{Deserialize, Serialize};

/// Configuration for hybrid retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Rank-smoothing constant for reciprocal rank fusion
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    /// Weight of the semantic (vector) ranking in fusion
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Weight of the keyword (BM25) ranking in fusion
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Candidates fetched from each source before fusion
    #[serde(default = "default_candidate_pool_size")]
    pub candidate_pool_size: usize,

    /// Results returned after fusion and reranking
    #[serde(default = "default_final_result_count")]
    pub final_result_count: usize,

    /// Minimum query length in characters
    #[serde(default = "default_min_query_length")]
    pub min_query_length: usize,

    /// Cache fused results per query string
    #[serde(default = "default_enable_cache")]
    pub enable_cache: bool,

    /// Maximum cached queries
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_rrf_k() -> f32 {
    60.0
}

fn default_semantic_weight() -> f32 {
    0.6
}

fn default_keyword_weight() -> f32 {
    0.4
}

fn default_candidate_pool_size() -> usize {
    50
}

fn default_final_result_count() -> usize {
    10
}

fn default_min_query_length() -> usize {
    2
}

fn default_enable_cache() -> bool {
    true
}

fn default_cache_size() -> usize {
    100
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            candidate_pool_size: default_candidate_pool_size(),
            final_result_count: default_final_result_count(),
            min_query_length: default_min_query_length(),
            enable_cache: default_enable_cache(),
            cache_size: default_cache_size(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.rrf_k <= 0.0 {
            return Err(format!("rrf_k must be positive, got {}", self.rrf_k));
        }
        if self.semantic_weight < 0.0 || self.keyword_weight < 0.0 {
            return Err("fusion weights must be non-negative".to_string());
        }
        if self.semantic_weight + self.keyword_weight <= 0.0 {
            return Err("at least one fusion weight must be positive".to_string());
        }
        if self.candidate_pool_size == 0 {
            return Err("candidate_pool_size must be at least 1".to_string());
        }
        if self.final_result_count == 0 {
            return Err("final_result_count must be at least 1".to_string());
        }
        if self.enable_cache && self.cache_size == 0 {
            return Err("cache_size must be at least 1 when caching is enabled".to_string());
        }
        Ok(())
    }
}

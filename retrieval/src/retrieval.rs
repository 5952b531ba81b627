use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::fusion::FusionEngine;
use crate::rerank::Reranker;
use crate::result::{SearchResults, SearchStats};
use docqa_embeddings::Encoder;
use docqa_index_store::{KeywordStore, VectorStore};
use log::{debug, info};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Hybrid retrieval pipeline combining semantic and keyword search.
///
/// Shares its store handles with the index-maintenance side, so search
/// always sees the live index. Fused results are cached per query
/// string; any index change must go through `notify_index_changed` to
/// drop stale entries.
pub struct HybridRetrieval {
    config: RetrievalConfig,
    vector: Arc<RwLock<VectorStore>>,
    keyword: Arc<RwLock<KeywordStore>>,
    encoder: Arc<dyn Encoder>,
    fusion: FusionEngine,
    reranker: Option<Arc<dyn Reranker>>,
    cache: RwLock<LruCache<String, SearchResults>>,
}

impl HybridRetrieval {
    pub fn new(
        config: RetrievalConfig,
        vector: Arc<RwLock<VectorStore>>,
        keyword: Arc<RwLock<KeywordStore>>,
        encoder: Arc<dyn Encoder>,
    ) -> Result<Self> {
        config.validate().map_err(RetrievalError::InvalidConfig)?;

        let cache_size = if config.enable_cache {
            config.cache_size
        } else {
            1
        };
        let cache_size = NonZeroUsize::new(cache_size)
            .ok_or_else(|| RetrievalError::Cache("cache size must be non-zero".to_string()))?;

        info!("Initializing hybrid retrieval pipeline");
        let fusion = FusionEngine::new(config.clone());
        Ok(Self {
            config,
            vector,
            keyword,
            encoder,
            fusion,
            reranker: None,
            cache: RwLock::new(LruCache::new(cache_size)),
        })
    }

    /// Attach an external reranking stage.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Run the full pipeline for one query.
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let start = Instant::now();

        if query.chars().count() < self.config.min_query_length {
            return Err(RetrievalError::QueryTooShort {
                min: self.config.min_query_length,
                actual: query.chars().count(),
            });
        }

        if self.config.enable_cache {
            let mut cache = self.cache.write().await;
            if let Some(cached) = cache.get(query) {
                debug!("Cache hit for query '{query}'");
                let mut results = cached.clone();
                results.stats.cache_hit = true;
                results.stats.total_time_ms = start.elapsed().as_millis() as u64;
                return Ok(results);
            }
        }

        let mut stats = SearchStats::default();

        // Both sources run concurrently; each reports its own timing.
        let pool = self.config.candidate_pool_size;
        let semantic_branch = async {
            let start = Instant::now();
            let query_embedding = self.encoder.encode_single(query).await?;
            let vector = self.vector.read().await;
            let hits = vector.search(&query_embedding, pool);
            Ok::<_, RetrievalError>((hits, start.elapsed().as_millis() as u64))
        };
        let keyword_branch = async {
            let start = Instant::now();
            let keyword = self.keyword.read().await;
            let hits = keyword.search(query, pool);
            (hits, start.elapsed().as_millis() as u64)
        };
        let (semantic_out, (keyword, keyword_time)) =
            tokio::join!(semantic_branch, keyword_branch);
        let (semantic, semantic_time) = semantic_out?;

        stats.semantic_time_ms = semantic_time;
        stats.semantic_count = semantic.len();
        stats.keyword_time_ms = keyword_time;
        stats.keyword_count = keyword.len();

        debug!(
            "Query '{query}': {} semantic + {} keyword candidates",
            stats.semantic_count, stats.keyword_count
        );

        let fusion_start = Instant::now();
        let mut fused = self.fusion.fuse(semantic, keyword);
        stats.fusion_time_ms = fusion_start.elapsed().as_millis() as u64;

        if let Some(reranker) = &self.reranker {
            let rerank_start = Instant::now();
            fused = reranker.rerank(query, fused).await?;
            stats.rerank_time_ms = rerank_start.elapsed().as_millis() as u64;
        }

        fused.truncate(self.config.final_result_count);
        for (rank, result) in fused.iter_mut().enumerate() {
            result.rank = rank;
        }

        stats.total_time_ms = start.elapsed().as_millis() as u64;
        let results = SearchResults::new(query.to_string())
            .with_total_candidates(stats.semantic_count + stats.keyword_count)
            .with_results(fused)
            .with_stats(stats);

        if self.config.enable_cache {
            let mut cache = self.cache.write().await;
            cache.put(query.to_string(), results.clone());
        }

        info!(
            "Search for '{query}' returned {} results in {}ms",
            results.len(),
            results.stats.total_time_ms
        );
        Ok(results)
    }

    /// Drop all cached results. Must be called after any index change.
    pub async fn notify_index_changed(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
        debug!("Search cache cleared after index change");
    }

    pub async fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.read().await;
        CacheStats {
            size: cache.len(),
            capacity: cache.cap().get(),
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
}

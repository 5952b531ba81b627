use crate::error::Result;
use crate::result::SearchResult;
use async_trait::async_trait;

/// Hook for refining fused results before they are returned.
///
/// Implementations receive results in fused order and return them in
/// final order; the pipeline reassigns ranks afterwards. A failure
/// aborts the whole search rather than silently returning unreranked
/// results.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>>;
}

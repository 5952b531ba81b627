use docqa_index_store::ScoredDocument;
use serde::{Deserialize, Serialize};

/// Source of a search result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchSource {
    /// From keyword (BM25) search
    Keyword,
    /// From semantic (vector) search
    Semantic,
    /// From hybrid fusion
    Hybrid,
}

/// A single search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The document chunk found
    pub document: ScoredDocument,

    /// Relevance score, higher is better
    pub score: f32,

    /// Source of this result
    pub source: SearchSource,

    /// Rank in the result list (0 = best)
    pub rank: usize,
}

impl SearchResult {
    pub fn new(document: ScoredDocument, score: f32, source: SearchSource) -> Self {
        Self {
            document,
            score,
            source,
            rank: 0,
        }
    }

    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }
}

/// Collection of search results with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// Query that produced these results
    pub query: String,

    /// Search results
    pub results: Vec<SearchResult>,

    /// Total number of candidates before fusion
    pub total_candidates: usize,

    /// Search statistics
    pub stats: SearchStats,
}

/// Search performance statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStats {
    /// Total search time in milliseconds
    pub total_time_ms: u64,

    /// Keyword search time in milliseconds
    pub keyword_time_ms: u64,

    /// Semantic search time in milliseconds
    pub semantic_time_ms: u64,

    /// Fusion time in milliseconds
    pub fusion_time_ms: u64,

    /// Reranking time in milliseconds
    pub rerank_time_ms: u64,

    /// Number of keyword results
    pub keyword_count: usize,

    /// Number of semantic results
    pub semantic_count: usize,

    /// Served from the query cache
    pub cache_hit: bool,
}

impl SearchResults {
    pub fn new(query: String) -> Self {
        Self {
            query,
            results: Vec::new(),
            total_candidates: 0,
            stats: SearchStats::default(),
        }
    }

    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results;
        self
    }

    pub fn with_total_candidates(mut self, count: usize) -> Self {
        self.total_candidates = count;
        self
    }

    pub fn with_stats(mut self, stats: SearchStats) -> Self {
        self.stats = stats;
        self
    }

    /// Top N results
    pub fn top(&self, n: usize) -> &[SearchResult] {
        &self.results[..n.min(self.results.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

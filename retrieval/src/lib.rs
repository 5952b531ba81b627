/*!
# Document Retrieval

Hybrid retrieval over the document QA index, combining:
- **Semantic search** via vector embeddings for conceptual similarity
- **Keyword search** via BM25 for exact term matches
- **Weighted Reciprocal Rank Fusion (RRF)** for result combination
- **Reranking hook** for external relevance refinement

## Architecture

```text
Query
  ├─> Semantic Search (embeddings)
  │     └─> Top-K candidates
  ├─> Keyword Search (BM25)
  │     └─> Top-K candidates
  └─> Weighted RRF Fusion
        └─> Optional reranking
              └─> Final ranked results
```

## Example

```rust,no_run
use docqa_embeddings::EmbeddingService;
use docqa_index_store::{KeywordStore, VectorStore};
use docqa_retrieval::{HybridRetrieval, RetrievalConfig};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let vector = Arc::new(RwLock::new(VectorStore::new(Path::new("vectors.json")).await?));
    let keyword = Arc::new(RwLock::new(KeywordStore::new()));
    let encoder = Arc::new(EmbeddingService::new().await?);

    let retrieval =
        HybridRetrieval::new(RetrievalConfig::default(), vector, keyword, encoder)?;
    let results = retrieval.search("what is the data retention policy").await?;

    for result in results.top(5) {
        println!("{} (score {:.3})", result.document.doc_id, result.score);
    }
    Ok(())
}
```
*/

mod config;
mod error;
mod fusion;
mod rerank;
mod result;
mod retrieval;

pub use config::RetrievalConfig;
pub use error::{Result, RetrievalError};
pub use fusion::FusionEngine;
pub use rerank::Reranker;
pub use result::{SearchResult, SearchResults, SearchSource, SearchStats};
pub use retrieval::{CacheStats, HybridRetrieval};

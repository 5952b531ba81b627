use crate::chunk::{Chunk, ChunkId, ScoredDocument};
use bm25::{Document, Language, SearchEngineBuilder};
use log::debug;
use std::collections::HashMap;

/// Entry kept alongside the BM25 engine so results can be materialized
/// without a second store lookup.
#[derive(Debug, Clone)]
struct IndexedDoc {
    chunk_id: ChunkId,
    file_path: String,
    chunk_index: usize,
    text: String,
}

/// BM25 keyword store over document chunks.
///
/// The bm25 crate supports upsert but not deletion, so removals drop the
/// entry from the live document map and rebuild the engine from what
/// remains. Rebuild cost is proportional to corpus size, acceptable for
/// per-document update granularity.
///
/// Not thread-safe; callers wrap it in a lock.
pub struct KeywordStore {
    search_engine: bm25::SearchEngine<u64>,
    docs: HashMap<u64, IndexedDoc>,
    id_by_chunk: HashMap<ChunkId, u64>,
    next_id: u64,
}

impl KeywordStore {
    /// Create an empty keyword store with English tokenization.
    pub fn new() -> Self {
        let empty_docs: Vec<Document<u64>> = vec![];
        let search_engine =
            SearchEngineBuilder::<u64>::with_documents(Language::English, empty_docs).build();

        Self {
            search_engine,
            docs: HashMap::new(),
            id_by_chunk: HashMap::new(),
            next_id: 0,
        }
    }

    /// Add chunks to the corpus. Re-adding a chunk id replaces its text.
    pub fn add(&mut self, chunks: &[Chunk]) {
        for chunk in chunks {
            let id = match self.id_by_chunk.get(&chunk.id) {
                Some(id) => *id,
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    self.id_by_chunk.insert(chunk.id.clone(), id);
                    id
                }
            };

            self.search_engine.upsert(Document {
                id,
                contents: chunk.text.clone(),
            });
            self.docs.insert(
                id,
                IndexedDoc {
                    chunk_id: chunk.id.clone(),
                    file_path: chunk.file_path.clone(),
                    chunk_index: chunk.chunk_index,
                    text: chunk.text.clone(),
                },
            );
        }
        debug!("Keyword store now tracks {} chunks", self.docs.len());
    }

    /// Remove every chunk of a file. Returns the number removed.
    pub fn remove_by_path(&mut self, file_path: &str) -> usize {
        let stale: Vec<u64> = self
            .docs
            .iter()
            .filter(|(_, doc)| doc.file_path == file_path)
            .map(|(id, _)| *id)
            .collect();
        self.remove_internal(&stale)
    }

    /// Remove chunks by id. Returns the number removed.
    pub fn remove_ids(&mut self, ids: &[ChunkId]) -> usize {
        let stale: Vec<u64> = ids
            .iter()
            .filter_map(|chunk_id| self.id_by_chunk.get(chunk_id).copied())
            .collect();
        self.remove_internal(&stale)
    }

    fn remove_internal(&mut self, stale: &[u64]) -> usize {
        if stale.is_empty() {
            return 0;
        }

        for id in stale {
            if let Some(doc) = self.docs.remove(id) {
                self.id_by_chunk.remove(&doc.chunk_id);
            }
        }
        self.rebuild();
        stale.len()
    }

    /// Rebuild the BM25 engine from the live document map.
    fn rebuild(&mut self) {
        let documents: Vec<Document<u64>> = self
            .docs
            .iter()
            .map(|(id, doc)| Document {
                id: *id,
                contents: doc.text.clone(),
            })
            .collect();
        self.search_engine =
            SearchEngineBuilder::<u64>::with_documents(Language::English, documents).build();
        debug!("Rebuilt keyword index with {} chunks", self.docs.len());
    }

    /// BM25-ranked search. Scores are raw BM25 values, higher is better.
    pub fn search(&self, query_text: &str, top_k: usize) -> Vec<ScoredDocument> {
        self.search_engine
            .search(query_text, top_k)
            .into_iter()
            .filter_map(|result| {
                self.docs.get(&result.document.id).map(|doc| ScoredDocument {
                    doc_id: doc.chunk_id.clone(),
                    file_path: doc.file_path.clone(),
                    chunk_index: doc.chunk_index,
                    text: doc.text.clone(),
                    score: result.score,
                })
            })
            .collect()
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Number of indexed chunks belonging to one file.
    pub fn count_by_path(&self, file_path: &str) -> usize {
        self.docs.values().filter(|d| d.file_path == file_path).count()
    }

    /// Check if the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl Default for KeywordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(path: &str, index: usize, text: &str) -> Chunk {
        Chunk::new(path, index, text)
    }

    #[test]
    fn test_keyword_search_matches_terms() {
        let mut store = KeywordStore::new();
        store.add(&[
            chunk("a.pdf", 0, "the quick brown fox jumps over the lazy dog"),
            chunk("a.pdf", 1, "the lazy cat sleeps all day"),
            chunk("b.pdf", 0, "quick brown rabbits hop in the garden"),
        ]);

        let results = store.search("quick brown", 2);
        assert!(results.len() <= 2);
        assert!(!results.is_empty());
        for result in &results {
            assert!(result.text.contains("quick"));
        }
    }

    #[test]
    fn test_remove_by_path_excludes_results() {
        let mut store = KeywordStore::new();
        store.add(&[
            chunk("a.pdf", 0, "refund policy details"),
            chunk("b.pdf", 0, "refund schedule timeline"),
        ]);

        let removed = store.remove_by_path("a.pdf");
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.count_by_path("a.pdf"), 0);
        assert_eq!(store.count_by_path("b.pdf"), 1);

        let results = store.search("refund", 10);
        assert!(results.iter().all(|r| r.file_path == "b.pdf"));
    }

    #[test]
    fn test_remove_ids() {
        let mut store = KeywordStore::new();
        let target = chunk("a.pdf", 0, "hello world");
        let id = target.id.clone();
        store.add(&[target, chunk("a.pdf", 1, "hello again")]);

        let removed = store.remove_ids(&[id]);
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_re_add_replaces_text() {
        let mut store = KeywordStore::new();
        store.add(&[chunk("a.pdf", 0, "original wording")]);
        store.add(&[chunk("a.pdf", 0, "revised wording")]);

        assert_eq!(store.len(), 1);
        let results = store.search("revised", 10);
        assert_eq!(results.len(), 1);
        assert!(store.search("original", 10).is_empty() || results[0].text.contains("revised"));
    }

    #[test]
    fn test_empty_store() {
        let store = KeywordStore::new();
        assert!(store.is_empty());
        assert!(store.search("anything", 5).is_empty());
    }
}

use crate::config::RetrievalConfig;
use crate::result::{SearchResult, SearchSource};
use docqa_index_store::{ChunkId, ScoredDocument};
use log::debug;
use std::collections::HashMap;

/// Combines keyword and semantic rankings with weighted reciprocal
/// rank fusion.
///
/// Each document contributes `weight / (k + rank)` per list it appears
/// in, rank counted from 1. Raw scores from the sources feed only the
/// tie-break, so the two scorers' incompatible scales never mix.
pub struct FusionEngine {
    config: RetrievalConfig,
}

struct Fused {
    document: ScoredDocument,
    fused_score: f32,
    /// Best raw score seen across the input lists, for tie-breaking
    best_raw: f32,
}

impl FusionEngine {
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    /// Fuse two ranked lists into one, best first. Deterministic for
    /// identical inputs: ties on fused score fall back to the higher
    /// raw input score, then to the document id.
    pub fn fuse(
        &self,
        semantic: Vec<ScoredDocument>,
        keyword: Vec<ScoredDocument>,
    ) -> Vec<SearchResult> {
        debug!(
            "RRF fusion: {} semantic + {} keyword candidates",
            semantic.len(),
            keyword.len()
        );

        let k = self.config.rrf_k;
        let mut fused: HashMap<ChunkId, Fused> = HashMap::new();

        for (rank, document) in semantic.into_iter().enumerate() {
            let contribution = self.config.semantic_weight / (k + rank as f32 + 1.0);
            Self::accumulate(&mut fused, document, contribution);
        }
        for (rank, document) in keyword.into_iter().enumerate() {
            let contribution = self.config.keyword_weight / (k + rank as f32 + 1.0);
            Self::accumulate(&mut fused, document, contribution);
        }

        let mut results: Vec<Fused> = fused.into_values().collect();
        results.sort_by(|a, b| {
            b.fused_score
                .total_cmp(&a.fused_score)
                .then(b.best_raw.total_cmp(&a.best_raw))
                .then_with(|| a.document.doc_id.as_str().cmp(b.document.doc_id.as_str()))
        });

        results
            .into_iter()
            .enumerate()
            .map(|(rank, entry)| {
                SearchResult::new(entry.document, entry.fused_score, SearchSource::Hybrid)
                    .with_rank(rank)
            })
            .collect()
    }

    fn accumulate(fused: &mut HashMap<ChunkId, Fused>, document: ScoredDocument, score: f32) {
        let raw = document.score;
        fused
            .entry(document.doc_id.clone())
            .and_modify(|entry| {
                entry.fused_score += score;
                entry.best_raw = entry.best_raw.max(raw);
            })
            .or_insert(Fused {
                document,
                fused_score: score,
                best_raw: raw,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_index_store::Chunk;
    use pretty_assertions::assert_eq;

    fn doc(path: &str, index: usize, score: f32) -> ScoredDocument {
        ScoredDocument::from_chunk(&Chunk::new(path, index, format!("text {path} {index}")), score)
    }

    fn engine() -> FusionEngine {
        FusionEngine::new(RetrievalConfig::default())
    }

    #[test]
    fn test_document_in_both_lists_outranks_single_source() {
        let semantic = vec![doc("a.pdf", 0, 0.9), doc("b.pdf", 0, 0.8)];
        let keyword = vec![doc("c.pdf", 0, 12.0), doc("a.pdf", 0, 11.0)];

        let fused = engine().fuse(semantic, keyword);
        // a.pdf#0 appears in both lists and must come out on top even
        // though it leads neither list outright.
        assert_eq!(fused[0].document.file_path, "a.pdf");
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_semantic_weight_dominates_equal_ranks() {
        // Same rank in each list; the 0.6 semantic weight must win
        // over the 0.4 keyword weight.
        let fused = engine().fuse(vec![doc("sem.pdf", 0, 0.5)], vec![doc("kw.pdf", 0, 20.0)]);
        assert_eq!(fused[0].document.file_path, "sem.pdf");
        assert_eq!(fused[1].document.file_path, "kw.pdf");
    }

    #[test]
    fn test_ranks_assigned_sequentially() {
        let fused = engine().fuse(
            vec![doc("a.pdf", 0, 0.9), doc("a.pdf", 1, 0.8), doc("a.pdf", 2, 0.7)],
            vec![],
        );
        let ranks: Vec<usize> = fused.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(fused.iter().all(|r| r.source == SearchSource::Hybrid));
    }

    #[test]
    fn test_tie_breaks_by_raw_score() {
        // Both documents hold rank 1 of exactly one list, so their
        // fused scores differ only by weight. With equal weights the
        // raw score decides.
        let engine = FusionEngine::new(RetrievalConfig {
            semantic_weight: 0.5,
            keyword_weight: 0.5,
            ..Default::default()
        });
        let fused = engine.fuse(vec![doc("low.pdf", 0, 0.2)], vec![doc("high.pdf", 0, 0.7)]);
        assert_eq!(fused[0].document.file_path, "high.pdf");
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let semantic = vec![doc("a.pdf", 0, 0.9), doc("b.pdf", 0, 0.8), doc("c.pdf", 0, 0.7)];
        let keyword = vec![doc("b.pdf", 0, 9.0), doc("d.pdf", 0, 8.0)];

        let first = engine().fuse(semantic.clone(), keyword.clone());
        let second = engine().fuse(semantic, keyword);
        let order = |results: &[SearchResult]| {
            results
                .iter()
                .map(|r| r.document.doc_id.as_str().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(engine().fuse(vec![], vec![]).is_empty());
        let one_sided = engine().fuse(vec![], vec![doc("a.pdf", 0, 3.0)]);
        assert_eq!(one_sided.len(), 1);
    }
}

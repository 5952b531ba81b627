use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use docqa_embeddings::{Encoder, cosine_similarity};
use docqa_index_store::Chunk;
use log::debug;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::collections::HashMap;
use std::sync::Arc;

/// How an old/new chunk pair was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Identical content hash
    Exact,
    /// Character-level similarity above the text threshold
    TextSimilar,
    /// Embedding cosine similarity above the semantic threshold
    SemanticSimilar,
}

/// A matched old/new chunk pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub old_chunk: Chunk,
    pub new_chunk: Chunk,
    /// Similarity in [0, 1]; 1.0 for exact matches
    pub similarity: f32,
    pub kind: MatchKind,
}

/// Classification of how a document's previous chunk set relates to its
/// newly extracted chunk set.
///
/// Every old chunk appears in exactly one of unchanged/modified/removed;
/// every new chunk in exactly one of unchanged/modified/added.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffResult {
    pub unchanged: Vec<ChunkMatch>,
    pub modified: Vec<ChunkMatch>,
    pub added: Vec<Chunk>,
    pub removed: Vec<Chunk>,
}

impl DiffResult {
    /// Fraction of the new chunk set that changed (modified + added +
    /// removed over the total new chunk count). 1.0 when the total is 0.
    pub fn change_ratio(&self, total_new_chunks: usize) -> f32 {
        if total_new_chunks == 0 {
            return 1.0;
        }
        let changed = self.modified.len() + self.added.len() + self.removed.len();
        changed as f32 / total_new_chunks as f32
    }

    /// Nothing changed at all.
    pub fn is_unchanged(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Candidate pairing considered by the greedy matcher.
struct Candidate {
    score: f32,
    index_distance: usize,
    old_idx: usize,
    new_idx: usize,
}

/// Classifies how two chunk sets of the same document relate.
///
/// Three passes in increasing cost: exact hash grouping, character-level
/// similarity on the residual, then embedding similarity on what is
/// left. The pairwise passes use greedy best-first assignment, which is
/// not globally optimal but stable and cheap; an exact assignment solver
/// could be dropped in behind the same interface if needed.
pub struct ChunkDiffer {
    config: UpdaterConfig,
    encoder: Option<Arc<dyn Encoder>>,
}

impl ChunkDiffer {
    /// Differ without a semantic pass (first two passes only).
    pub fn new(config: UpdaterConfig) -> Self {
        Self {
            config,
            encoder: None,
        }
    }

    /// Differ with all three passes enabled.
    pub fn with_encoder(config: UpdaterConfig, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            config,
            encoder: Some(encoder),
        }
    }

    /// Classify `old` against `new`. Deterministic and side-effect free
    /// apart from encoder calls in the semantic pass.
    pub async fn diff(&self, old: &[Chunk], new: &[Chunk]) -> Result<DiffResult> {
        Self::validate(old)?;
        Self::validate(new)?;

        let mut old_matched = vec![false; old.len()];
        let mut new_matched = vec![false; new.len()];
        let mut result = DiffResult::default();

        // Pass 1: exact content-hash matches.
        self.exact_pass(old, new, &mut old_matched, &mut new_matched, &mut result);

        // Pass 2: character-level similarity on the residual.
        self.text_pass(old, new, &mut old_matched, &mut new_matched, &mut result);

        // Pass 3: embedding similarity on what is left.
        if self.config.semantic_pass {
            self.semantic_pass(old, new, &mut old_matched, &mut new_matched, &mut result)
                .await?;
        }

        for (i, matched) in old_matched.iter().enumerate() {
            if !matched {
                result.removed.push(old[i].clone());
            }
        }
        for (j, matched) in new_matched.iter().enumerate() {
            if !matched {
                result.added.push(new[j].clone());
            }
        }

        debug!(
            "diff: {} unchanged, {} modified, {} added, {} removed",
            result.unchanged.len(),
            result.modified.len(),
            result.added.len(),
            result.removed.len()
        );

        Ok(result)
    }

    fn validate(chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            if chunk.content_hash != Chunk::hash_text(&chunk.text) {
                return Err(UpdateError::Diff(format!(
                    "chunk {} carries a stale content hash",
                    chunk.id
                )));
            }
        }
        Ok(())
    }

    fn exact_pass(
        &self,
        old: &[Chunk],
        new: &[Chunk],
        old_matched: &mut [bool],
        new_matched: &mut [bool],
        result: &mut DiffResult,
    ) {
        let mut by_hash: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, chunk) in old.iter().enumerate() {
            by_hash.entry(chunk.content_hash.as_str()).or_default().push(i);
        }

        for (j, chunk) in new.iter().enumerate() {
            let Some(indices) = by_hash.get_mut(chunk.content_hash.as_str()) else {
                continue;
            };

            // Duplicate text may appear in several chunks; each old chunk
            // may be claimed once, nearest original position first.
            let best = indices
                .iter()
                .enumerate()
                .filter(|&(_, &i)| !old_matched[i])
                .min_by_key(|&(_, &i)| old[i].chunk_index.abs_diff(chunk.chunk_index));

            if let Some((pos, &i)) = best {
                indices.remove(pos);
                old_matched[i] = true;
                new_matched[j] = true;
                result.unchanged.push(ChunkMatch {
                    old_chunk: old[i].clone(),
                    new_chunk: chunk.clone(),
                    similarity: 1.0,
                    kind: MatchKind::Exact,
                });
            }
        }
    }

    fn text_pass(
        &self,
        old: &[Chunk],
        new: &[Chunk],
        old_matched: &mut [bool],
        new_matched: &mut [bool],
        result: &mut DiffResult,
    ) {
        let mut candidates = Vec::new();
        for (i, old_chunk) in old.iter().enumerate() {
            if old_matched[i] {
                continue;
            }
            for (j, new_chunk) in new.iter().enumerate() {
                if new_matched[j] {
                    continue;
                }
                let ratio =
                    TextDiff::from_chars(old_chunk.text.as_str(), new_chunk.text.as_str()).ratio();
                if ratio >= self.config.text_similarity_threshold {
                    candidates.push(Candidate {
                        score: ratio,
                        index_distance: old_chunk.chunk_index.abs_diff(new_chunk.chunk_index),
                        old_idx: i,
                        new_idx: j,
                    });
                }
            }
        }

        Self::claim_greedy(
            candidates,
            old,
            new,
            old_matched,
            new_matched,
            MatchKind::TextSimilar,
            result,
        );
    }

    async fn semantic_pass(
        &self,
        old: &[Chunk],
        new: &[Chunk],
        old_matched: &mut [bool],
        new_matched: &mut [bool],
        result: &mut DiffResult,
    ) -> Result<()> {
        let Some(encoder) = &self.encoder else {
            return Ok(());
        };

        let old_rest: Vec<usize> = (0..old.len()).filter(|&i| !old_matched[i]).collect();
        let new_rest: Vec<usize> = (0..new.len()).filter(|&j| !new_matched[j]).collect();
        if old_rest.is_empty() || new_rest.is_empty() {
            return Ok(());
        }

        // Encode everything that lacks a stored embedding in one batch.
        let mut texts = Vec::new();
        let mut pending: Vec<(bool, usize)> = Vec::new();
        for &i in &old_rest {
            if old[i].embedding.is_none() {
                texts.push(old[i].text.clone());
                pending.push((true, i));
            }
        }
        for &j in &new_rest {
            if new[j].embedding.is_none() {
                texts.push(new[j].text.clone());
                pending.push((false, j));
            }
        }

        let mut encoded: HashMap<(bool, usize), Vec<f32>> = HashMap::new();
        if !texts.is_empty() {
            let vectors = encoder.encode(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(UpdateError::Apply(format!(
                    "encoder returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            for (key, vector) in pending.into_iter().zip(vectors) {
                encoded.insert(key, vector);
            }
        }

        let embedding_of = |is_old: bool, idx: usize| -> &[f32] {
            let stored = if is_old {
                old[idx].embedding.as_deref()
            } else {
                new[idx].embedding.as_deref()
            };
            match stored {
                Some(v) => v,
                None => encoded
                    .get(&(is_old, idx))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]),
            }
        };

        let mut candidates = Vec::new();
        for &i in &old_rest {
            for &j in &new_rest {
                let score = cosine_similarity(embedding_of(true, i), embedding_of(false, j));
                if score >= self.config.semantic_similarity_threshold {
                    candidates.push(Candidate {
                        score,
                        index_distance: old[i].chunk_index.abs_diff(new[j].chunk_index),
                        old_idx: i,
                        new_idx: j,
                    });
                }
            }
        }

        Self::claim_greedy(
            candidates,
            old,
            new,
            old_matched,
            new_matched,
            MatchKind::SemanticSimilar,
            result,
        );
        Ok(())
    }

    /// Greedy best-first assignment: repeatedly claim the globally
    /// highest-scoring unmatched pair. Ties prefer the pair whose chunks
    /// stayed nearest their original position, then the lowest indices,
    /// keeping the outcome deterministic.
    fn claim_greedy(
        mut candidates: Vec<Candidate>,
        old: &[Chunk],
        new: &[Chunk],
        old_matched: &mut [bool],
        new_matched: &mut [bool],
        kind: MatchKind,
        result: &mut DiffResult,
    ) {
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.index_distance.cmp(&b.index_distance))
                .then(a.old_idx.cmp(&b.old_idx))
                .then(a.new_idx.cmp(&b.new_idx))
        });

        for candidate in candidates {
            if old_matched[candidate.old_idx] || new_matched[candidate.new_idx] {
                continue;
            }
            old_matched[candidate.old_idx] = true;
            new_matched[candidate.new_idx] = true;
            result.modified.push(ChunkMatch {
                old_chunk: old[candidate.old_idx].clone(),
                new_chunk: new[candidate.new_idx].clone(),
                similarity: candidate.score,
                kind,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_embeddings::testing::StubEncoder;
    use pretty_assertions::assert_eq;

    fn chunks(path: &str, texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(path, i, *t))
            .collect()
    }

    fn differ() -> ChunkDiffer {
        ChunkDiffer::new(UpdaterConfig {
            semantic_pass: false,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_diff_identical_is_all_unchanged() {
        let old = chunks("a.pdf", &["first paragraph", "second paragraph", "third"]);
        let result = differ().diff(&old, &old).await.expect("diff");

        assert_eq!(result.unchanged.len(), 3);
        assert!(result.modified.is_empty());
        assert!(result.added.is_empty());
        assert!(result.removed.is_empty());
        for m in &result.unchanged {
            assert_eq!(m.kind, MatchKind::Exact);
            assert_eq!(m.similarity, 1.0);
        }
    }

    #[tokio::test]
    async fn test_empty_old_is_all_added() {
        let new = chunks("a.pdf", &["one", "two"]);
        let result = differ().diff(&[], &new).await.expect("diff");
        assert_eq!(result.added.len(), 2);
        assert!(result.unchanged.is_empty());
        assert!(result.removed.is_empty());
    }

    #[tokio::test]
    async fn test_empty_new_is_all_removed() {
        let old = chunks("a.pdf", &["one", "two"]);
        let result = differ().diff(&old, &[]).await.expect("diff");
        assert_eq!(result.removed.len(), 2);
        assert!(result.added.is_empty());
    }

    #[tokio::test]
    async fn test_both_empty() {
        let result = differ().diff(&[], &[]).await.expect("diff");
        assert!(result.is_unchanged());
        assert!(result.unchanged.is_empty());
    }

    #[tokio::test]
    async fn test_small_edit_is_text_similar() {
        let old = chunks(
            "a.pdf",
            &["the refund window lasts thirty days from purchase"],
        );
        let new = chunks(
            "a.pdf",
            &["the refund window lasts sixty days from purchase"],
        );

        let result = differ().diff(&old, &new).await.expect("diff");
        assert_eq!(result.modified.len(), 1);
        assert_eq!(result.modified[0].kind, MatchKind::TextSimilar);
        assert!(result.modified[0].similarity >= 0.70);
        assert!(result.added.is_empty());
        assert!(result.removed.is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_text_is_add_plus_remove() {
        let old = chunks("a.pdf", &["quarterly financial summary tables"]);
        let new = chunks("a.pdf", &["zebra xylophone"]);

        let result = differ().diff(&old, &new).await.expect("diff");
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.removed.len(), 1);
        assert!(result.modified.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_text_not_double_matched() {
        let old = chunks("a.pdf", &["repeated", "repeated"]);
        let new = chunks("a.pdf", &["repeated"]);

        let result = differ().diff(&old, &new).await.expect("diff");
        assert_eq!(result.unchanged.len(), 1);
        assert_eq!(result.removed.len(), 1);
    }

    #[tokio::test]
    async fn test_exact_match_prefers_nearest_position() {
        // The same text lives at indices 0 and 5; the new occurrence at
        // index 4 should claim the old chunk at index 5.
        let old = chunks("a.pdf", &["repeated", "b", "c", "d", "e", "repeated"]);
        let new = vec![Chunk::new("a.pdf", 4, "repeated")];

        let result = differ().diff(&old, &new).await.expect("diff");
        assert_eq!(result.unchanged.len(), 1);
        assert_eq!(result.unchanged[0].old_chunk.chunk_index, 5);

        // Symmetric check from the front.
        let new = vec![Chunk::new("a.pdf", 1, "repeated")];
        let result = differ().diff(&old, &new).await.expect("diff");
        assert_eq!(result.unchanged[0].old_chunk.chunk_index, 0);
    }

    #[tokio::test]
    async fn test_completeness_invariant() {
        let old = chunks("a.pdf", &["alpha section", "beta section", "gamma section"]);
        let new = chunks(
            "a.pdf",
            &["alpha section", "beta section revised words", "entirely new content zone"],
        );

        let result = differ().diff(&old, &new).await.expect("diff");

        let old_accounted =
            result.unchanged.len() + result.modified.len() + result.removed.len();
        let new_accounted = result.unchanged.len() + result.modified.len() + result.added.len();
        assert_eq!(old_accounted, old.len());
        assert_eq!(new_accounted, new.len());
    }

    #[tokio::test]
    async fn test_stale_hash_rejected() {
        let mut chunk = Chunk::new("a.pdf", 0, "text");
        chunk.content_hash = "deadbeef".to_string();

        let result = differ().diff(&[chunk], &[]).await;
        assert!(matches!(result, Err(UpdateError::Diff(_))));
    }

    #[tokio::test]
    async fn test_semantic_pass_catches_reordered_tokens() {
        // Character-level similarity misses a full token reversal, but
        // the stub encoder sees an identical token multiset.
        let config = UpdaterConfig {
            text_similarity_threshold: 0.95,
            ..Default::default()
        };
        let encoder = Arc::new(StubEncoder::new());
        let differ = ChunkDiffer::with_encoder(config, encoder);

        let old = chunks("a.pdf", &["zebra yonder xylophone walrus vulture"]);
        let new = chunks("a.pdf", &["vulture walrus xylophone yonder zebra"]);

        let result = differ.diff(&old, &new).await.expect("diff");
        assert_eq!(result.modified.len(), 1);
        assert_eq!(result.modified[0].kind, MatchKind::SemanticSimilar);
    }

    #[tokio::test]
    async fn test_semantic_pass_disabled_falls_through() {
        let config = UpdaterConfig {
            text_similarity_threshold: 0.95,
            semantic_pass: false,
            ..Default::default()
        };
        let differ = ChunkDiffer::new(config);

        let old = chunks("a.pdf", &["zebra yonder xylophone walrus vulture"]);
        let new = chunks("a.pdf", &["vulture walrus xylophone yonder zebra"]);

        let result = differ.diff(&old, &new).await.expect("diff");
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.removed.len(), 1);
    }

    #[tokio::test]
    async fn test_change_ratio() {
        let result = DiffResult {
            unchanged: Vec::new(),
            modified: Vec::new(),
            added: chunks("a.pdf", &["x"]),
            removed: chunks("a.pdf", &["y"]),
        };
        assert!((result.change_ratio(4) - 0.5).abs() < f32::EPSILON);
        assert_eq!(result.change_ratio(0), 1.0);
    }
}

use crate::config::UpdaterConfig;
use crate::diff::DiffResult;
use log::debug;
use serde::{Deserialize, Serialize};

/// How an update should be applied to the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateStrategy {
    /// Drop and rebuild every chunk for the file
    FullReindex,
    /// Touch only the changed chunks
    ChunkUpdate,
    /// Touch changed chunks and revalidate unchanged ones without
    /// re-embedding. Currently applied like `ChunkUpdate`; the
    /// revalidation step is an extension point.
    SmartHybrid,
}

/// Outcome of strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDecision {
    pub strategy: UpdateStrategy,
    /// Human-readable justification, surfaced in logs and results
    pub reason: String,
    /// Estimated fraction of full-reindex work avoided, in [0, 1]
    pub estimated_time_savings: f32,
}

/// Cost-aware strategy selection. Pure, no I/O.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    config: UpdaterConfig,
}

impl StrategySelector {
    pub fn new(config: UpdaterConfig) -> Self {
        Self { config }
    }

    /// Pick a strategy from a computed diff.
    pub fn select(
        &self,
        diff: &DiffResult,
        total_new_chunks: usize,
        file_size_bytes: Option<u64>,
    ) -> StrategyDecision {
        let change_ratio = diff.change_ratio(total_new_chunks);
        let decision = self.decide(change_ratio, total_new_chunks);
        debug!(
            "strategy {:?} for {} chunks (ratio {:.3}, size {:?}): {}",
            decision.strategy, total_new_chunks, change_ratio, file_size_bytes, decision.reason
        );
        decision
    }

    /// Cheap pre-check variant used before a diff exists (e.g. from a
    /// size-delta estimate). Agrees with `select` for an equivalent
    /// change ratio.
    pub fn select_simple(&self, change_ratio: f32, total_chunks: usize) -> StrategyDecision {
        self.decide(change_ratio, total_chunks)
    }

    fn decide(&self, change_ratio: f32, total_chunks: usize) -> StrategyDecision {
        if total_chunks < self.config.min_chunks_for_incremental {
            return StrategyDecision {
                strategy: UpdateStrategy::FullReindex,
                reason: format!(
                    "file too small for incremental overhead ({total_chunks} chunks, minimum {})",
                    self.config.min_chunks_for_incremental
                ),
                estimated_time_savings: 0.0,
            };
        }

        if change_ratio > self.config.full_reindex_threshold {
            return StrategyDecision {
                strategy: UpdateStrategy::FullReindex,
                reason: format!(
                    "change ratio {change_ratio:.2} above {:.2}, incremental bookkeeping would cost more than it saves",
                    self.config.full_reindex_threshold
                ),
                estimated_time_savings: 0.0,
            };
        }

        if change_ratio < self.config.chunk_update_threshold {
            return StrategyDecision {
                strategy: UpdateStrategy::ChunkUpdate,
                reason: format!(
                    "change ratio {change_ratio:.2} below {:.2}, updating changed chunks only",
                    self.config.chunk_update_threshold
                ),
                estimated_time_savings: (1.0 - change_ratio).clamp(0.0, 1.0),
            };
        }

        StrategyDecision {
            strategy: UpdateStrategy::SmartHybrid,
            reason: format!(
                "change ratio {change_ratio:.2} in the middle band, updating changed chunks and revalidating the rest"
            ),
            estimated_time_savings: (0.5 * (1.0 - change_ratio)).clamp(0.0, 1.0),
        }
    }
}

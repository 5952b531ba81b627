use crate::config::UpdaterConfig;
use crate::diff::{ChunkDiffer, DiffResult};
use crate::error::{Result, UpdateError};
use crate::queue::{ChangeKind, UpdateTask};
use crate::strategy::{StrategySelector, UpdateStrategy};
use chrono::{DateTime, Utc};
use docqa_embeddings::Encoder;
use docqa_index_store::{
    Chunk, ChunkId, DocumentSource, FileMetadata, KeywordStore, MetadataStore, ProcessingStatus,
    VectorStore,
};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Pre-update snapshot of a file's index state, held in memory for the
/// duration of one update so a failed apply can be undone.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub file_path: String,
    pub created_at: DateTime<Utc>,
    /// Indexed chunks for the file, embeddings included
    pub chunks: Vec<Chunk>,
    pub metadata: Option<FileMetadata>,
}

/// Outcome of one update attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResult {
    pub success: bool,
    pub file_path: String,
    pub strategy_used: Option<UpdateStrategy>,
    /// Chunks modified, added, or removed by the update
    pub chunks_changed: usize,
    pub duration: Duration,
    pub error: Option<String>,
}

struct AppliedUpdate {
    strategy_used: Option<UpdateStrategy>,
    chunks_changed: usize,
    /// Chunk count the stores must hold for this file afterwards
    expected_chunks: usize,
}

/// Applies a single update task to the index stores.
///
/// Runs checkpoint, apply, verify in order. A failure in apply or
/// verify rolls the file back to its checkpoint; other files are never
/// touched. `execute` reports failures through `UpdateResult` rather
/// than an error return, so a bad document cannot take down the worker.
pub struct UpdateExecutor {
    vector: Arc<RwLock<VectorStore>>,
    keyword: Arc<RwLock<KeywordStore>>,
    metadata: Arc<RwLock<MetadataStore>>,
    encoder: Arc<dyn Encoder>,
    source: Arc<dyn DocumentSource>,
    differ: ChunkDiffer,
    selector: StrategySelector,
}

impl UpdateExecutor {
    pub fn new(
        config: UpdaterConfig,
        vector: Arc<RwLock<VectorStore>>,
        keyword: Arc<RwLock<KeywordStore>>,
        metadata: Arc<RwLock<MetadataStore>>,
        encoder: Arc<dyn Encoder>,
        source: Arc<dyn DocumentSource>,
    ) -> Result<Self> {
        config.validate().map_err(UpdateError::InvalidConfig)?;
        let differ = ChunkDiffer::with_encoder(config.clone(), encoder.clone());
        let selector = StrategySelector::new(config);
        Ok(Self {
            vector,
            keyword,
            metadata,
            encoder,
            source,
            differ,
            selector,
        })
    }

    /// Run one update. A diff computed upstream (e.g. by a pre-check)
    /// can be passed in to avoid recomputing it.
    pub async fn execute(
        &self,
        task: &UpdateTask,
        precomputed_diff: Option<DiffResult>,
    ) -> UpdateResult {
        let started = Instant::now();
        let checkpoint = self.checkpoint(&task.file_path).await;

        let applied = match self.apply(task, &checkpoint, precomputed_diff).await {
            Ok(applied) => applied,
            Err(err) => {
                return self
                    .fail_and_rollback(task, &checkpoint, started, err.to_string())
                    .await;
            }
        };

        if let Err(err) = self
            .verify(&task.file_path, applied.expected_chunks)
            .await
        {
            return self
                .fail_and_rollback(task, &checkpoint, started, err.to_string())
                .await;
        }

        // Commit: the checkpoint is simply dropped.
        info!(
            "Updated {} via {:?}: {} chunks changed in {:?}",
            task.file_path,
            applied.strategy_used,
            applied.chunks_changed,
            started.elapsed()
        );
        UpdateResult {
            success: true,
            file_path: task.file_path.clone(),
            strategy_used: applied.strategy_used,
            chunks_changed: applied.chunks_changed,
            duration: started.elapsed(),
            error: None,
        }
    }

    async fn checkpoint(&self, file_path: &str) -> Checkpoint {
        let chunks = self.vector.read().await.get_chunks_by_path(file_path);
        let metadata = self.metadata.read().await.get(file_path).cloned();
        debug!(
            "Checkpointed {} chunks for {file_path}",
            chunks.len()
        );
        Checkpoint {
            file_path: file_path.to_string(),
            created_at: Utc::now(),
            chunks,
            metadata,
        }
    }

    async fn apply(
        &self,
        task: &UpdateTask,
        checkpoint: &Checkpoint,
        precomputed_diff: Option<DiffResult>,
    ) -> Result<AppliedUpdate> {
        if task.change_kind == ChangeKind::Deleted {
            return self.apply_deletion(&task.file_path).await;
        }

        let new_chunks = self.source.extract_chunks(&task.file_path).await?;
        let diff = match precomputed_diff {
            Some(diff) => diff,
            None => self.differ.diff(&checkpoint.chunks, &new_chunks).await?,
        };
        let decision = self
            .selector
            .select(&diff, new_chunks.len(), task.file_size_bytes);

        match decision.strategy {
            UpdateStrategy::FullReindex => {
                self.apply_full_reindex(&task.file_path, new_chunks).await
            }
            // SmartHybrid currently reuses the chunk-update path; its
            // revalidation half lands with background consistency checks.
            UpdateStrategy::ChunkUpdate | UpdateStrategy::SmartHybrid => {
                self.apply_chunk_update(&task.file_path, &diff, decision.strategy)
                    .await
            }
        }
    }

    async fn apply_deletion(&self, file_path: &str) -> Result<AppliedUpdate> {
        let removed = self.vector.write().await.remove_by_path(file_path).await?;
        self.keyword.write().await.remove_by_path(file_path);
        self.metadata.write().await.remove(file_path)?;
        debug!("Removed {removed} chunks for deleted file {file_path}");
        Ok(AppliedUpdate {
            strategy_used: None,
            chunks_changed: removed,
            expected_chunks: 0,
        })
    }

    async fn apply_full_reindex(
        &self,
        file_path: &str,
        chunks: Vec<Chunk>,
    ) -> Result<AppliedUpdate> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.encoder.encode(&texts).await?;
        let total = chunks.len();

        {
            let mut vector = self.vector.write().await;
            vector.remove_by_path(file_path).await?;
            vector.insert(chunks.clone(), embeddings).await?;
        }
        {
            let mut keyword = self.keyword.write().await;
            keyword.remove_by_path(file_path);
            keyword.add(&chunks);
        }
        self.metadata
            .write()
            .await
            .upsert(FileMetadata::indexed(file_path, total))?;

        Ok(AppliedUpdate {
            strategy_used: Some(UpdateStrategy::FullReindex),
            chunks_changed: total,
            expected_chunks: total,
        })
    }

    /// Re-embeds only modified and added chunks; unchanged chunks keep
    /// their existing embeddings untouched.
    async fn apply_chunk_update(
        &self,
        file_path: &str,
        diff: &DiffResult,
        strategy: UpdateStrategy,
    ) -> Result<AppliedUpdate> {
        let mut fresh: Vec<Chunk> = diff
            .modified
            .iter()
            .map(|m| m.new_chunk.clone())
            .collect();
        fresh.extend(diff.added.iter().cloned());

        let mut stale: Vec<ChunkId> = diff.removed.iter().map(|c| c.id.clone()).collect();
        stale.extend(diff.modified.iter().map(|m| m.old_chunk.id.clone()));

        // Insertions and removals shift the positions of chunks after
        // them. Unchanged chunks whose position moved must be stored
        // under their new identity; the stored embedding carries over.
        let mut relocated: Vec<Chunk> = Vec::new();
        for m in &diff.unchanged {
            if m.old_chunk.id == m.new_chunk.id {
                continue;
            }
            stale.push(m.old_chunk.id.clone());
            match m.old_chunk.embedding.clone() {
                Some(embedding) => relocated.push(m.new_chunk.clone().with_embedding(embedding)),
                None => fresh.push(m.new_chunk.clone()),
            }
        }

        let texts: Vec<String> = fresh.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.encoder.encode(&texts).await?
        };

        {
            let mut vector = self.vector.write().await;
            vector.remove_ids(&stale).await?;
            vector.insert(fresh.clone(), embeddings).await?;
            vector.insert_embedded(relocated.clone()).await?;
        }
        {
            let mut keyword = self.keyword.write().await;
            keyword.remove_ids(&stale);
            keyword.add(&fresh);
            keyword.add(&relocated);
        }

        let expected = diff.unchanged.len() + diff.modified.len() + diff.added.len();
        self.metadata
            .write()
            .await
            .upsert(FileMetadata::indexed(file_path, expected))?;

        Ok(AppliedUpdate {
            strategy_used: Some(strategy),
            chunks_changed: diff.modified.len() + diff.added.len() + diff.removed.len(),
            expected_chunks: expected,
        })
    }

    /// Consistency check between the stores and the expected post-update
    /// state for this file.
    async fn verify(&self, file_path: &str, expected_chunks: usize) -> Result<()> {
        let actual = self
            .vector
            .read()
            .await
            .get_chunks_by_path(file_path)
            .len();
        if actual != expected_chunks {
            return Err(UpdateError::Verify(format!(
                "{file_path}: vector store holds {actual} chunks, expected {expected_chunks}"
            )));
        }

        let keyword_count = self.keyword.read().await.count_by_path(file_path);
        if keyword_count != expected_chunks {
            return Err(UpdateError::Verify(format!(
                "{file_path}: keyword store holds {keyword_count} chunks, expected {expected_chunks}"
            )));
        }

        let metadata = self.metadata.read().await;
        match metadata.get(file_path) {
            Some(meta) => {
                if meta.status != ProcessingStatus::Indexed || meta.chunk_count != expected_chunks {
                    return Err(UpdateError::Verify(format!(
                        "{file_path}: metadata records {:?}/{} chunks, expected Indexed/{expected_chunks}",
                        meta.status, meta.chunk_count
                    )));
                }
            }
            // Metadata absence is the deletion case.
            None if expected_chunks == 0 => {}
            None => {
                return Err(UpdateError::Verify(format!(
                    "{file_path}: metadata missing after update"
                )));
            }
        }
        Ok(())
    }

    async fn fail_and_rollback(
        &self,
        task: &UpdateTask,
        checkpoint: &Checkpoint,
        started: Instant,
        cause: String,
    ) -> UpdateResult {
        warn!("Update of {} failed, rolling back: {cause}", task.file_path);

        let error = match self.rollback(checkpoint).await {
            Ok(()) => cause,
            Err(rollback_err) => {
                error!(
                    "Rollback of {} failed, index state for this file may be inconsistent: {rollback_err}",
                    task.file_path
                );
                format!("{cause}; rollback also failed: {rollback_err}")
            }
        };

        UpdateResult {
            success: false,
            file_path: task.file_path.clone(),
            strategy_used: None,
            chunks_changed: 0,
            duration: started.elapsed(),
            error: Some(error),
        }
    }

    /// Restore the file's pre-update state from the checkpoint.
    async fn rollback(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.restore_checkpoint(checkpoint)
            .await
            .map_err(|err| UpdateError::Rollback(err.to_string()))
    }

    async fn restore_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let file_path = &checkpoint.file_path;

        let mut restore = checkpoint.chunks.clone();
        let missing: Vec<usize> = restore
            .iter()
            .enumerate()
            .filter(|(_, c)| c.embedding.is_none())
            .map(|(i, _)| i)
            .collect();
        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|&i| restore[i].text.clone()).collect();
            let embeddings = self.encoder.encode(&texts).await?;
            for (&i, embedding) in missing.iter().zip(embeddings) {
                restore[i].embedding = Some(embedding);
            }
        }

        {
            let mut vector = self.vector.write().await;
            vector.remove_by_path(file_path).await?;
            vector.insert_embedded(restore.clone()).await?;
        }
        {
            let mut keyword = self.keyword.write().await;
            keyword.remove_by_path(file_path);
            keyword.add(&restore);
        }

        let mut metadata = self.metadata.write().await;
        match &checkpoint.metadata {
            Some(meta) => metadata.upsert(meta.clone())?,
            None => {
                metadata.remove(file_path)?;
            }
        }

        info!(
            "Rolled {file_path} back to checkpoint of {} ({} chunks)",
            checkpoint.created_at,
            restore.len()
        );
        Ok(())
    }
}

use crate::error::IndexStoreError;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Processing status of a file in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    /// Only metadata recorded, chunks not yet indexed
    MetadataOnly,
    /// Fully indexed
    Indexed,
    /// Last update attempt failed
    Error,
}

/// Per-file index metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Path of the source document
    pub file_path: String,

    /// Processing status
    pub status: ProcessingStatus,

    /// Number of chunks currently indexed for this file
    pub chunk_count: usize,

    /// Hash of the file content when last indexed
    pub content_hash: Option<String>,

    /// Time of the last successful or attempted update
    pub updated_at: DateTime<Utc>,
}

impl FileMetadata {
    pub fn indexed(file_path: impl Into<String>, chunk_count: usize) -> Self {
        Self {
            file_path: file_path.into(),
            status: ProcessingStatus::Indexed,
            chunk_count,
            content_hash: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }
}

/// Persistent map of file path to index metadata.
///
/// The single source of truth for per-file processing state; nothing
/// else in the system keeps a parallel file map.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MetadataState {
    version: u32,
    files: HashMap<String, FileMetadata>,
}

/// Metadata store with JSON persistence: load-or-fresh on open,
/// save after every mutation.
#[derive(Debug)]
pub struct MetadataStore {
    state_path: PathBuf,
    state: MetadataState,
}

impl MetadataStore {
    const CURRENT_VERSION: u32 = 1;

    /// Open or create a metadata store backed by the given file.
    pub fn open(state_path: &Path) -> Result<Self, IndexStoreError> {
        let state = if state_path.exists() {
            let content = fs::read_to_string(state_path)?;
            match serde_json::from_str::<MetadataState>(&content) {
                Ok(state) if state.version == Self::CURRENT_VERSION => state,
                Ok(state) => {
                    warn!(
                        "Metadata version mismatch: {} vs {}. Starting fresh.",
                        state.version,
                        Self::CURRENT_VERSION
                    );
                    MetadataState {
                        version: Self::CURRENT_VERSION,
                        files: HashMap::new(),
                    }
                }
                Err(e) => {
                    warn!("Could not parse metadata state: {e}. Starting fresh.");
                    MetadataState {
                        version: Self::CURRENT_VERSION,
                        files: HashMap::new(),
                    }
                }
            }
        } else {
            MetadataState {
                version: Self::CURRENT_VERSION,
                files: HashMap::new(),
            }
        };

        Ok(Self {
            state_path: state_path.to_path_buf(),
            state,
        })
    }

    fn save(&self) -> Result<(), IndexStoreError> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.state_path, content)?;
        Ok(())
    }

    /// Metadata for a file, if recorded.
    pub fn get(&self, file_path: &str) -> Option<&FileMetadata> {
        self.state.files.get(file_path)
    }

    /// Insert or replace the metadata for a file.
    pub fn upsert(&mut self, metadata: FileMetadata) -> Result<(), IndexStoreError> {
        self.state.files.insert(metadata.file_path.clone(), metadata);
        self.save()
    }

    /// Remove the metadata for a file. Returns the removed entry.
    pub fn remove(&mut self, file_path: &str) -> Result<Option<FileMetadata>, IndexStoreError> {
        let removed = self.state.files.remove(file_path);
        if removed.is_some() {
            self.save()?;
        }
        Ok(removed)
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.state.files.len()
    }

    /// Check if no files are tracked.
    pub fn is_empty(&self) -> bool {
        self.state.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_upsert_and_get() {
        let temp = TempDir::new().expect("temp dir");
        let mut store = MetadataStore::open(&temp.path().join("meta.json")).expect("open");

        store
            .upsert(FileMetadata::indexed("a.pdf", 12))
            .expect("upsert");

        let meta = store.get("a.pdf").expect("present");
        assert_eq!(meta.chunk_count, 12);
        assert_eq!(meta.status, ProcessingStatus::Indexed);
        assert!(store.get("b.pdf").is_none());
    }

    #[test]
    fn test_persistence_roundtrip() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("meta.json");

        {
            let mut store = MetadataStore::open(&path).expect("open");
            store
                .upsert(FileMetadata::indexed("a.pdf", 3).with_content_hash("abc"))
                .expect("upsert");
        }

        let reloaded = MetadataStore::open(&path).expect("open");
        let meta = reloaded.get("a.pdf").expect("present");
        assert_eq!(meta.chunk_count, 3);
        assert_eq!(meta.content_hash.as_deref(), Some("abc"));
    }

    #[test]
    fn test_remove() {
        let temp = TempDir::new().expect("temp dir");
        let mut store = MetadataStore::open(&temp.path().join("meta.json")).expect("open");

        store
            .upsert(FileMetadata::indexed("a.pdf", 1))
            .expect("upsert");
        let removed = store.remove("a.pdf").expect("remove");
        assert!(removed.is_some());
        assert!(store.is_empty());
        assert!(store.remove("a.pdf").expect("remove").is_none());
    }

    #[test]
    fn test_corrupt_state_starts_fresh() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("meta.json");
        fs::write(&path, "not json").expect("write");

        let store = MetadataStore::open(&path).expect("open");
        assert!(store.is_empty());
    }
}

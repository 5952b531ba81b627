use crate::chunk::Chunk;
use crate::error::IndexStoreError;
use async_trait::async_trait;

/// External text-extraction collaborator.
///
/// Format handling (PDF, DOCX, OCR) lives outside this core; the update
/// executor only needs fresh chunks for a path when re-extraction is
/// required. Returned chunks carry no embeddings.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Extract and chunk the current content of a document.
    async fn extract_chunks(&self, file_path: &str) -> Result<Vec<Chunk>, IndexStoreError>;

    /// Size of the document in bytes, if cheaply available.
    async fn file_size_bytes(&self, _file_path: &str) -> Option<u64> {
        None
    }
}

//! # DocQA Index Store
//!
//! Storage backends for the document chunk index: a vector store for
//! semantic similarity search, a BM25 keyword store for lexical search,
//! and a metadata store tracking per-file processing state. These are
//! the three shared resources that the update executor mutates and the
//! query pipeline reads.
//!
//! ## Example
//!
//! ```no_run
//! use docqa_index_store::{Chunk, VectorStore};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut store = VectorStore::new(Path::new(".docqa/vectors.json")).await?;
//!
//!     let chunk = Chunk::new("handbook.pdf", 0, "Employees accrue vacation monthly.");
//!     store.insert(vec![chunk], vec![vec![0.1; 768]]).await?;
//!
//!     println!("{} chunks stored", store.count());
//!     Ok(())
//! }
//! ```

mod chunk;
mod error;
mod keyword;
mod metadata;
mod source;
mod vector;

pub use chunk::{Chunk, ChunkId, ScoredDocument};
pub use error::IndexStoreError;
pub use keyword::KeywordStore;
pub use metadata::{FileMetadata, MetadataStore, ProcessingStatus};
pub use source::DocumentSource;
pub use vector::{VectorStore, VectorStoreConfig};

pub type Result<T> = std::result::Result<T, IndexStoreError>;

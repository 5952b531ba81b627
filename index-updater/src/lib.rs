//! Incremental index maintenance for the document QA index.
//!
//! When a document changes, re-embedding every chunk is wasteful: most
//! edits touch a small part of a file. This crate diffs the old and new
//! chunkings ([`ChunkDiffer`]), picks an update strategy from the change
//! ratio ([`StrategySelector`]), schedules work by usage-derived
//! priority ([`UpdateQueue`]), and applies updates transactionally with
//! checkpoint rollback ([`UpdateExecutor`]) from a single background
//! worker ([`UpdateWorker`]).

mod config;
mod diff;
mod error;
mod executor;
mod queue;
mod strategy;
mod worker;

pub use config::UpdaterConfig;
pub use diff::{ChunkDiffer, ChunkMatch, DiffResult, MatchKind};
pub use error::{Result, UpdateError};
pub use executor::{UpdateExecutor, UpdateResult};
pub use queue::{
    ChangeKind, FailedUpdate, PriorityHints, QueueStatus, UpdateQueue, UpdateTask,
};
pub use strategy::{StrategyDecision, StrategySelector, UpdateStrategy};
pub use worker::UpdateWorker;

//! Storage collaborator interfaces.
//!
//! The nearest-neighbor index and the record store are external capabilities;
//! the search engine consumes them through these traits. `MemoryIndex`
//! provides a brute-force in-memory implementation for tests, benches, and
//! the CLI demo.

pub mod memory;

pub use memory::MemoryIndex;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{MessageHit, Task, TaskHit};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index backend error: {0}")]
    Backend(String),
}

/// Top-K nearest-neighbor lookups over the two entity tables.
///
/// Both lookups return up to `k` hits ordered ascending by distance, and an
/// empty list (never an error) when nothing matches. Records without an
/// embedding never appear.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn nearest_tasks(&self, vector: &[f32], k: usize) -> Result<Vec<TaskHit>, IndexError>;

    async fn nearest_messages(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<MessageHit>, IndexError>;
}

/// Batched record fetch for hydrating message-discovered candidates.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Returns only the records found; missing ids are silently absent.
    async fn fetch_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<Task>, IndexError>;
}

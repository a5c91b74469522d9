//! In-memory index for tests and development.
//!
//! Stores tasks and messages in memory and answers nearest-neighbor queries
//! by brute-force L2 distance. Not suitable for production data volumes.


use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::index::{IndexError, TaskStore, VectorIndex};
use crate::model::{Message, MessageHit, Task, TaskHit};

#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
    messages: Arc<RwLock<HashMap<String, Message>>>,
}

impl MemoryIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub async fn insert_task(&self, task: Task) {
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    #[inline]
    pub async fn insert_message(&self, message: Message) {
        self.messages
            .write()
            .await
            .insert(message.id.clone(), message);
    }

    #[inline]
    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    #[inline]
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    #[inline]
    pub async fn remove_task(&self, id: &str) -> Option<Task> {
        self.tasks.write().await.remove(id)
    }

    /// Euclidean distance between two vectors. Mismatched dimensions yield an
    /// infinite distance so the record sorts last rather than panicking.
    fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return f32::INFINITY;
        }

        a.iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum::<f32>()
            .sqrt()
    }

    fn top_k<T>(mut scored: Vec<(T, f32)>, k: usize) -> Vec<(T, f32)> {
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        scored
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn nearest_tasks(&self, vector: &[f32], k: usize) -> Result<Vec<TaskHit>, IndexError> {
        let tasks = self.tasks.read().await;

        let scored: Vec<(Task, f32)> = tasks
            .values()
            .filter_map(|task| {
                task.embedding
                    .as_ref()
                    .map(|embedding| (task.clone(), Self::l2_distance(embedding, vector)))
            })
            .collect();

        let hits = Self::top_k(scored, k)
            .into_iter()
            .map(|(task, distance)| TaskHit { task, distance })
            .collect::<Vec<_>>();

        debug!("nearest_tasks returned {} hits (k={})", hits.len(), k);
        Ok(hits)
    }

    async fn nearest_messages(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<MessageHit>, IndexError> {
        let messages = self.messages.read().await;

        let scored: Vec<(Message, f32)> = messages
            .values()
            .filter_map(|message| {
                message
                    .embedding
                    .as_ref()
                    .map(|embedding| (message.clone(), Self::l2_distance(embedding, vector)))
            })
            .collect();

        let hits = Self::top_k(scored, k)
            .into_iter()
            .map(|(message, distance)| MessageHit { message, distance })
            .collect::<Vec<_>>();

        debug!("nearest_messages returned {} hits (k={})", hits.len(), k);
        Ok(hits)
    }
}

#[async_trait]
impl TaskStore for MemoryIndex {
    async fn fetch_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<Task>, IndexError> {
        let tasks = self.tasks.read().await;
        Ok(ids.iter().filter_map(|id| tasks.get(id).cloned()).collect())
    }
}

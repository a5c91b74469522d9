//! Semantic cross-entity search pipeline.
//!
//! Query text is embedded once, then tasks and messages are searched
//! independently in vector space. The two hit lists are merged into one
//! candidate map keyed by task id, message-discovered candidates are
//! hydrated with their task records in a single batched fetch, and the
//! survivors are ranked by their best distance across all evidence.


pub mod merge;
pub mod rank;
pub mod snippet;

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::SearchOptions;
use crate::embedder::Embedder;
use crate::index::{TaskStore, VectorIndex};
use crate::model::{RankedTask, SearchCandidate};
use crate::{Result, SearchError};

/// The search engine. Collaborators are injected once at construction and
/// shared by reference; each call to [`search`](Self::search) is stateless.
pub struct SearchEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn TaskStore>,
    options: SearchOptions,
}

impl SearchEngine {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn TaskStore>,
        options: SearchOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Run a search with the configured result limit.
    #[inline]
    pub async fn search(&self, query: &str) -> Result<Vec<RankedTask>> {
        self.search_with_limit(query, self.options.final_limit).await
    }

    /// Run a search with a caller-provided result limit.
    ///
    /// The limit is clamped to `initial_k`: the fan-out can never produce
    /// more unique tasks than hits.
    #[inline]
    pub async fn search_with_limit(&self, query: &str, limit: usize) -> Result<Vec<RankedTask>> {
        let query = query.trim();
        if query.chars().count() < self.options.min_query_length {
            return Err(SearchError::InvalidQuery(format!(
                "Search query must be at least {} characters long",
                self.options.min_query_length
            )));
        }
        let limit = limit.clamp(1, self.options.initial_k);

        let query_vector = self.embedder.embed(query).map_err(|e| {
            error!("Failed to generate embedding for query '{}': {}", query, e);
            SearchError::EmbeddingUnavailable(e.to_string())
        })?;
        debug!(
            "Searching with query '{}' ({} dimensions, k={})",
            query,
            query_vector.len(),
            self.options.initial_k
        );

        // The two lookups are independent; issue them concurrently.
        let (task_hits, message_hits) = tokio::try_join!(
            self.index.nearest_tasks(&query_vector, self.options.initial_k),
            self.index.nearest_messages(&query_vector, self.options.initial_k),
        )
        .map_err(|e| {
            error!(
                "Nearest-neighbor lookup failed for query '{}': {}",
                query, e
            );
            SearchError::StorageUnavailable(e.to_string())
        })?;

        debug!(
            "Merging {} task hits and {} message hits",
            task_hits.len(),
            message_hits.len()
        );

        // Parents first, then children; the order is load-bearing.
        let candidates = merge::candidates_from_tasks(task_hits);
        let candidates = merge::fold_in_messages(
            candidates,
            message_hits,
            query,
            self.options.snippet_max_length,
        );

        let candidates = self.hydrate(candidates, query).await?;

        let results = rank::rank_candidates(candidates, query, &self.options, limit);
        info!("Search for '{}' produced {} results", query, results.len());
        Ok(results)
    }

    /// Complete candidates discovered only through a message match with their
    /// task records, using one batched fetch. Candidates whose task cannot be
    /// found are dropped: data deleted between the index lookup and this
    /// fetch is an expected race, not a defect.
    async fn hydrate(
        &self,
        mut candidates: BTreeMap<String, SearchCandidate>,
        query: &str,
    ) -> Result<BTreeMap<String, SearchCandidate>> {
        let missing_ids: Vec<String> = candidates
            .values()
            .filter(|candidate| candidate.task.is_none())
            .map(|candidate| candidate.task_id.clone())
            .collect();

        if missing_ids.is_empty() {
            return Ok(candidates);
        }

        debug!(
            "Hydrating {} message-discovered candidates",
            missing_ids.len()
        );

        let fetched = self
            .store
            .fetch_tasks_by_ids(&missing_ids)
            .await
            .map_err(|e| {
                error!(
                    "Batched task fetch failed for query '{}': {}",
                    query, e
                );
                SearchError::StorageUnavailable(e.to_string())
            })?;

        for task in fetched {
            if let Some(candidate) = candidates.get_mut(&task.id) {
                candidate.task = Some(task);
            }
        }

        candidates.retain(|task_id, candidate| {
            if candidate.task.is_none() {
                warn!(
                    "Dropping candidate {}: task details could not be fetched",
                    task_id
                );
                false
            } else {
                true
            }
        });

        Ok(candidates)
    }
}

//! Two-phase candidate merge.
//!
//! The two nearest-neighbor result sets are combined into one map keyed by
//! task id. Processing order is a contract: all task hits first, then all
//! message hits. This guarantees a directly-matched task is never created
//! twice and that `direct_distance` is only ever set from a true task-level
//! hit. Both phases are pure functions over owned inputs, so running the
//! merge twice on the same hit lists produces an identical map.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::model::{MessageHit, MessageMatch, SearchCandidate, TaskHit};
use crate::search::snippet::context_snippet;

/// Phase one: seed the candidate map from direct task hits.
///
/// A duplicate hit for the same task id overwrites the earlier entry.
#[inline]
pub fn candidates_from_tasks(task_hits: Vec<TaskHit>) -> BTreeMap<String, SearchCandidate> {
    let mut candidates = BTreeMap::new();
    for hit in task_hits {
        candidates.insert(hit.task.id.clone(), SearchCandidate::from_task_hit(hit));
    }
    candidates
}

/// Phase two: fold message hits into the candidate map.
///
/// A message whose parent task already has a candidate appends its context to
/// that candidate (keeping the match list sorted and `best_distance` at the
/// minimum). A message whose parent was not directly hit creates a new
/// candidate with no task data; hydration completes it later. Every matched
/// message is retained here; the display cap is applied at ranking time.
#[inline]
pub fn fold_in_messages(
    mut candidates: BTreeMap<String, SearchCandidate>,
    message_hits: Vec<MessageHit>,
    query: &str,
    snippet_max_length: usize,
) -> BTreeMap<String, SearchCandidate> {
    for hit in message_hits {
        let snippet = context_snippet(&hit.message.content, query, snippet_max_length);
        let context = MessageMatch {
            id: hit.message.id,
            content: hit.message.content,
            distance: hit.distance,
            created_at: hit.message.created_at,
            snippet,
        };

        match candidates.entry(hit.message.task_id) {
            Entry::Occupied(mut entry) => entry.get_mut().push_message_match(context),
            Entry::Vacant(entry) => {
                let task_id = entry.key().clone();
                entry.insert(SearchCandidate::from_message_match(task_id, context));
            }
        }
    }
    candidates
}

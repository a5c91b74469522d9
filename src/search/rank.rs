//! Final relevance ranking and result assembly.

use itertools::Itertools;
use std::collections::BTreeMap;

use crate::config::SearchOptions;
use crate::model::{MatchSource, RankedTask, SearchCandidate};
use crate::search::snippet::context_snippet;

/// Assemble the enriched, ordered result list from hydrated candidates.
///
/// Each candidate keeps its top `max_relevant_messages` message contexts
/// (already sorted ascending by distance), gets a provenance tag per
/// [`SearchCandidate::match_source`], and receives a snippet of its own text
/// only when that provenance includes the task. Results are sorted ascending
/// by best distance and truncated to `limit`. Candidates still missing task
/// data are skipped; hydration has already logged those.
#[inline]
pub fn rank_candidates(
    candidates: BTreeMap<String, SearchCandidate>,
    query: &str,
    options: &SearchOptions,
    limit: usize,
) -> Vec<RankedTask> {
    candidates
        .into_values()
        .filter_map(|candidate| build_result(candidate, query, options))
        .sorted_by(|a, b| a.best_distance.total_cmp(&b.best_distance))
        .take(limit)
        .collect()
}

fn build_result(
    candidate: SearchCandidate,
    query: &str,
    options: &SearchOptions,
) -> Option<RankedTask> {
    let match_source = candidate.match_source();
    let task = candidate.task?;

    let relevant_messages = if candidate.matched_messages.is_empty() {
        None
    } else {
        Some(
            candidate
                .matched_messages
                .into_iter()
                .take(options.max_relevant_messages)
                .collect(),
        )
    };

    let task_snippet = match match_source {
        MatchSource::Task | MatchSource::TaskAndMessage => {
            let text = task.description.as_deref().unwrap_or(&task.name);
            Some(context_snippet(text, query, options.snippet_max_length))
        }
        MatchSource::Message => None,
    };

    Some(RankedTask {
        id: task.id,
        name: task.name,
        description: task.description,
        tags: task.tags,
        category: task.category,
        created_at: task.created_at,
        updated_at: task.updated_at,
        best_distance: candidate.best_distance,
        match_source,
        relevant_messages,
        task_snippet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MessageMatch, Task, TaskHit};
    use chrono::{TimeZone, Utc};

    fn task(id: &str, description: Option<&str>) -> Task {
        let timestamp = Utc
            .with_ymd_and_hms(2024, 5, 14, 9, 30, 0)
            .single()
            .expect("valid timestamp");
        Task {
            id: id.to_string(),
            name: format!("Task {id}"),
            description: description.map(str::to_string),
            tags: Vec::new(),
            category: "bug".to_string(),
            created_at: timestamp,
            updated_at: timestamp,
            embedding: None,
        }
    }

    fn message_match(id: &str, distance: f32) -> MessageMatch {
        MessageMatch {
            id: id.to_string(),
            content: "login error on staging".to_string(),
            distance,
            created_at: Utc
                .with_ymd_and_hms(2024, 5, 14, 10, 0, 0)
                .single()
                .expect("valid timestamp"),
            snippet: "login error on staging".to_string(),
        }
    }

    fn direct_candidate(id: &str, distance: f32) -> SearchCandidate {
        SearchCandidate::from_task_hit(TaskHit {
            task: task(id, Some("login error handling for the web client")),
            distance,
        })
    }

    fn candidate_map(candidates: Vec<SearchCandidate>) -> BTreeMap<String, SearchCandidate> {
        candidates
            .into_iter()
            .map(|c| (c.task_id.clone(), c))
            .collect()
    }

    #[test]
    fn results_sorted_ascending_and_truncated() {
        let candidates = candidate_map(vec![
            direct_candidate("t1", 0.5),
            direct_candidate("t2", 0.1),
            direct_candidate("t3", 0.3),
        ]);

        let results = rank_candidates(candidates, "login", &SearchOptions::default(), 2);

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t3"]);
    }

    #[test]
    fn task_only_candidate_gets_task_snippet_and_no_messages() {
        let candidates = candidate_map(vec![direct_candidate("t1", 0.1)]);
        let results = rank_candidates(candidates, "login", &SearchOptions::default(), 5);

        let result = &results[0];
        assert_eq!(result.match_source, MatchSource::Task);
        assert!(result.relevant_messages.is_none());
        let snippet = result.task_snippet.as_deref().expect("task snippet");
        assert!(snippet.contains("login"));
    }

    #[test]
    fn message_led_candidate_gets_no_task_snippet() {
        let mut candidate = direct_candidate("t1", 0.4);
        candidate.push_message_match(message_match("m1", 0.1));

        let results = rank_candidates(
            candidate_map(vec![candidate]),
            "login",
            &SearchOptions::default(),
            5,
        );

        let result = &results[0];
        assert_eq!(result.match_source, MatchSource::Message);
        assert!(result.task_snippet.is_none());
        assert!(result.relevant_messages.is_some());
        assert_eq!(result.best_distance, 0.1);
    }

    #[test]
    fn snippet_falls_back_to_name_without_description() {
        let candidate = SearchCandidate::from_task_hit(TaskHit {
            task: task("t1", None),
            distance: 0.1,
        });

        let results = rank_candidates(
            candidate_map(vec![candidate]),
            "Task",
            &SearchOptions::default(),
            5,
        );

        let snippet = results[0].task_snippet.as_deref().expect("task snippet");
        assert!(snippet.contains("Task t1"));
    }

    #[test]
    fn relevant_messages_capped_at_configured_maximum() {
        let mut candidate = direct_candidate("t1", 0.5);
        for (i, distance) in [0.1_f32, 0.2, 0.3, 0.4].iter().enumerate() {
            candidate.push_message_match(message_match(&format!("m{i}"), *distance));
        }

        let results = rank_candidates(
            candidate_map(vec![candidate]),
            "login",
            &SearchOptions::default(),
            5,
        );

        let messages = results[0]
            .relevant_messages
            .as_ref()
            .expect("messages present");
        assert_eq!(messages.len(), 3);
        let distances: Vec<f32> = messages.iter().map(|m| m.distance).collect();
        assert_eq!(distances, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn unhydrated_candidates_are_excluded() {
        let bare = SearchCandidate::from_message_match("ghost".to_string(), message_match("m1", 0.01));
        let candidates = candidate_map(vec![bare, direct_candidate("t1", 0.9)]);

        let results = rank_candidates(candidates, "login", &SearchOptions::default(), 5);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "t1");
    }
}

#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tasklens::SearchError;
use tasklens::config::SearchOptions;
use tasklens::embedder::{EmbedError, Embedder};
use tasklens::index::{MemoryIndex, VectorIndex};
use tasklens::model::{MatchSource, Message, Task};
use tasklens::search::SearchEngine;

/// Deterministic embedder for end-to-end tests: one dimension per topic
/// keyword, so distances in the index reflect simple word overlap.
struct KeywordEmbedder;

const TOPICS: [&str; 3] = ["payment", "login", "deploy"];

fn keyword_vector(text: &str) -> Vec<f32> {
    let lowered = text.to_lowercase();
    TOPICS
        .iter()
        .map(|topic| lowered.matches(topic).count() as f32)
        .collect()
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(keyword_vector(text))
    }
}

fn task(id: &str, name: &str, description: &str) -> Task {
    let timestamp = Utc
        .with_ymd_and_hms(2024, 5, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp");
    Task {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        tags: Vec::new(),
        category: "bug".to_string(),
        created_at: timestamp,
        updated_at: timestamp,
        embedding: Some(keyword_vector(&format!("{name}\n{description}"))),
    }
}

fn message(id: &str, task_id: &str, content: &str) -> Message {
    Message {
        id: id.to_string(),
        content: content.to_string(),
        sender_id: "u1".to_string(),
        created_at: Utc
            .with_ymd_and_hms(2024, 5, 14, 10, 0, 0)
            .single()
            .expect("valid timestamp"),
        task_id: task_id.to_string(),
        embedding: Some(keyword_vector(content)),
    }
}

async fn build_engine() -> SearchEngine {
    let index = MemoryIndex::new();

    index
        .insert_task(task(
            "pay-1",
            "Payment gateway retries",
            "payment payment retries fail for EU cards",
        ))
        .await;
    index
        .insert_task(task(
            "login-1",
            "Login flow rework",
            "login login redirect loop after session expiry",
        ))
        .await;
    // No direct topical overlap; only its messages mention deploys.
    index
        .insert_task(task("infra-1", "Quarterly cleanup", "remove stale branches"))
        .await;

    index
        .insert_message(message(
            "m-pay",
            "pay-1",
            "payment keeps failing on the staging gateway",
        ))
        .await;
    index
        .insert_message(message(
            "m-deploy-1",
            "infra-1",
            "deploy deploy deploy broke again last night",
        ))
        .await;
    index
        .insert_message(message(
            "m-deploy-2",
            "infra-1",
            "the deploy pipeline needs a rollback step",
        ))
        .await;

    let index = Arc::new(index);
    SearchEngine::new(
        Arc::new(KeywordEmbedder),
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        index,
        SearchOptions::default(),
    )
}

#[tokio::test]
async fn direct_match_carries_task_provenance_and_snippet() {
    let engine = build_engine().await;

    let results = engine.search("login redirect").await.expect("search ok");

    assert!(!results.is_empty());
    let top = &results[0];
    assert_eq!(top.id, "login-1");
    assert!(matches!(
        top.match_source,
        MatchSource::Task | MatchSource::TaskAndMessage
    ));
    let snippet = top.task_snippet.as_deref().expect("task snippet");
    assert!(snippet.to_lowercase().contains("login"));
}

#[tokio::test]
async fn message_only_evidence_surfaces_hydrated_parent() {
    let engine = build_engine().await;

    let results = engine.search("deploy rollback").await.expect("search ok");

    let top = &results[0];
    assert_eq!(top.id, "infra-1");
    // The task record itself never mentions deploys, so its details must have
    // come from the batched hydration fetch.
    assert_eq!(top.name, "Quarterly cleanup");
    assert_eq!(top.match_source, MatchSource::Message);
    assert!(top.task_snippet.is_none());

    let messages = top.relevant_messages.as_ref().expect("messages");
    assert!(messages.len() >= 2);
    let distances: Vec<f32> = messages.iter().map(|m| m.distance).collect();
    let mut sorted = distances.clone();
    sorted.sort_by(f32::total_cmp);
    assert_eq!(distances, sorted);
}

#[tokio::test]
async fn combined_evidence_ranks_by_best_distance() {
    let engine = build_engine().await;

    let results = engine.search("payment failing").await.expect("search ok");

    let top = &results[0];
    assert_eq!(top.id, "pay-1");
    assert!(top.relevant_messages.is_some());
    for window in results.windows(2) {
        assert!(window[0].best_distance <= window[1].best_distance);
    }
}

#[tokio::test]
async fn repeated_searches_return_identical_results() {
    let engine = build_engine().await;

    let first = engine.search("payment failing").await.expect("search ok");
    let second = engine.search("payment failing").await.expect("search ok");

    let first_ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn limit_caps_the_result_list() {
    let engine = build_engine().await;

    let results = engine
        .search_with_limit("payment login deploy", 1)
        .await
        .expect("search ok");
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn too_short_query_is_rejected() {
    let engine = build_engine().await;

    let result = engine.search("p").await;
    assert!(matches!(result, Err(SearchError::InvalidQuery(_))));
}

#[tokio::test]
async fn ranked_results_serialize_with_snake_case_provenance() {
    let engine = build_engine().await;

    let results = engine.search("deploy rollback").await.expect("search ok");
    let json = serde_json::to_value(&results[0]).expect("serialize");

    assert_eq!(json["match_source"], "message");
    assert!(json["relevant_messages"].is_array());
}

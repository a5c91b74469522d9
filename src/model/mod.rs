
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task record. The embedding is populated lazily by the embedding
/// collaborator and stays `None` until then; records without an embedding are
/// invisible to vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A chat message belonging to exactly one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender_id: String,
    pub created_at: DateTime<Utc>,
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A task returned by a nearest-neighbor lookup, with its vector distance.
/// Smaller distance means more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskHit {
    pub task: Task,
    pub distance: f32,
}

/// A message returned by a nearest-neighbor lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageHit {
    pub message: Message,
    pub distance: f32,
}

/// A matched message carried along as evidence for its parent task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageMatch {
    pub id: String,
    pub content: String,
    pub distance: f32,
    pub created_at: DateTime<Utc>,
    pub snippet: String,
}

/// Which kind of evidence produced a candidate's best score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Task,
    Message,
    TaskAndMessage,
}

impl std::fmt::Display for MatchSource {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            MatchSource::Task => write!(f, "task"),
            MatchSource::Message => write!(f, "message"),
            MatchSource::TaskAndMessage => write!(f, "task_and_message"),
        }
    }
}

/// Per-query aggregation of all evidence that one task is relevant.
///
/// `task` is `None` when the candidate was discovered only through a message
/// match and has not been hydrated yet. Invariant: `best_distance` equals the
/// minimum of `direct_distance` (when present) and every match distance, and
/// `matched_messages` stays sorted ascending by distance.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    pub task_id: String,
    pub task: Option<Task>,
    pub direct_distance: Option<f32>,
    pub matched_messages: Vec<MessageMatch>,
    pub best_distance: f32,
}

impl SearchCandidate {
    /// Create a candidate from a direct task hit.
    #[inline]
    pub fn from_task_hit(hit: TaskHit) -> Self {
        Self {
            task_id: hit.task.id.clone(),
            task: Some(hit.task),
            direct_distance: Some(hit.distance),
            matched_messages: Vec::new(),
            best_distance: hit.distance,
        }
    }

    /// Create a candidate discovered only through a message match. Task data
    /// is absent until hydration.
    #[inline]
    pub fn from_message_match(task_id: String, context: MessageMatch) -> Self {
        let best_distance = context.distance;
        Self {
            task_id,
            task: None,
            direct_distance: None,
            matched_messages: vec![context],
            best_distance,
        }
    }

    /// Fold another matched message into this candidate, keeping the match
    /// list sorted ascending by distance and `best_distance` at the minimum.
    #[inline]
    pub fn push_message_match(&mut self, context: MessageMatch) {
        if context.distance < self.best_distance {
            self.best_distance = context.distance;
        }
        self.matched_messages.push(context);
        self.matched_messages
            .sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }

    /// Determine provenance: whichever evidence produced the lowest distance
    /// wins, with ties favoring the task.
    #[inline]
    pub fn match_source(&self) -> MatchSource {
        match self.direct_distance {
            Some(direct) if direct <= self.best_distance => {
                if self.matched_messages.is_empty() {
                    MatchSource::Task
                } else {
                    MatchSource::TaskAndMessage
                }
            }
            _ => MatchSource::Message,
        }
    }
}

/// Final enriched result for one task, ordered by `best_distance`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTask {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub best_distance: f32,
    pub match_source: MatchSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevant_messages: Option<Vec<MessageMatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_snippet: Option<String>,
}

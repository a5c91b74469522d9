//! Text-to-vector collaborator interface and its HTTP client implementation.

pub mod http;

pub use http::HttpEmbedder;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Cannot embed empty text")]
    EmptyInput,

    #[error("Embedding service error: {0}")]
    Service(String),

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Maps arbitrary text to a fixed-length vector. The model itself lives
/// behind this seam; the search engine only ever calls `embed`.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

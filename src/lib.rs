use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    /// Query rejected before any collaborator call was made.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The text-to-vector collaborator failed or is unreachable.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A nearest-neighbor lookup or record fetch failed.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod embedder;
pub mod index;
pub mod model;
pub mod search;

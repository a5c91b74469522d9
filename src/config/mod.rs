//! TOML configuration management for the search engine and its collaborators.


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

const CONFIG_DIR_ENV: &str = "TASKLENS_CONFIG_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub search: SearchOptions,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Connection settings for the Ollama-compatible embedding service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedderConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for EmbedderConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Tunables for the candidate merge and ranking pipeline.
///
/// `initial_k` controls recall vs. cost: both nearest-neighbor lookups fetch
/// this many hits so the merge step has room to discover additional tasks via
/// their messages. `final_limit` caps the ranked result list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchOptions {
    pub initial_k: usize,
    pub final_limit: usize,
    pub max_relevant_messages: usize,
    pub snippet_max_length: usize,
    pub min_query_length: usize,
}

impl Default for SearchOptions {
    #[inline]
    fn default() -> Self {
        Self {
            initial_k: 20,
            final_limit: 5,
            max_relevant_messages: 3,
            snippet_max_length: 150,
            min_query_length: 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid initial_k: {0} (must be between 1 and 500)")]
    InvalidInitialK(usize),
    #[error("Invalid final_limit: {0} (must be between 1 and 50)")]
    InvalidFinalLimit(usize),
    #[error("initial_k ({0}) must not be smaller than final_limit ({1})")]
    InitialKTooSmall(usize, usize),
    #[error("Invalid max_relevant_messages: {0} (must be between 1 and 20)")]
    InvalidMaxRelevantMessages(usize),
    #[error("Invalid snippet_max_length: {0} (must be between 40 and 2000)")]
    InvalidSnippetMaxLength(usize),
    #[error("Invalid min_query_length: {0} (must be between 1 and 64)")]
    InvalidMinQueryLength(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Get the configuration directory, honoring the `TASKLENS_CONFIG_DIR`
/// environment variable override.
#[inline]
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    dirs::config_dir()
        .map(|dir| dir.join("tasklens"))
        .ok_or(ConfigError::DirectoryError)
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                embedder: EmbedderConfig::default(),
                search: SearchOptions::default(),
                base_dir: config_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedder.validate()?;
        self.search.validate()?;
        Ok(())
    }
}

impl EmbedderConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        self.url()?;
        Ok(())
    }

    /// Base URL of the embedding service.
    #[inline]
    pub fn url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl SearchOptions {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=500).contains(&self.initial_k) {
            return Err(ConfigError::InvalidInitialK(self.initial_k));
        }

        if !(1..=50).contains(&self.final_limit) {
            return Err(ConfigError::InvalidFinalLimit(self.final_limit));
        }

        if self.initial_k < self.final_limit {
            return Err(ConfigError::InitialKTooSmall(
                self.initial_k,
                self.final_limit,
            ));
        }

        if !(1..=20).contains(&self.max_relevant_messages) {
            return Err(ConfigError::InvalidMaxRelevantMessages(
                self.max_relevant_messages,
            ));
        }

        if !(40..=2000).contains(&self.snippet_max_length) {
            return Err(ConfigError::InvalidSnippetMaxLength(
                self.snippet_max_length,
            ));
        }

        if !(1..=64).contains(&self.min_query_length) {
            return Err(ConfigError::InvalidMinQueryLength(self.min_query_length));
        }

        Ok(())
    }
}

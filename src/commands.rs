//! CLI command implementations.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, get_config_dir};
use crate::embedder::{Embedder, HttpEmbedder};
use crate::index::MemoryIndex;
use crate::model::{MatchSource, Message, RankedTask, Task};
use crate::search::SearchEngine;

/// A demo dataset: tasks and their chat messages, as exported JSON.
#[derive(Debug, Deserialize)]
struct Fixture {
    tasks: Vec<Task>,
    #[serde(default)]
    messages: Vec<Message>,
}

/// Embedding cache written beside the fixture. Entries are keyed by record id
/// and remember the exact text they were computed from, so records are never
/// re-embedded unless their content changed.
#[derive(Debug, Default, Serialize, Deserialize)]
struct EmbeddingCache {
    entries: HashMap<String, CachedEmbedding>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedEmbedding {
    text: String,
    embedding: Vec<f32>,
}

impl EmbeddingCache {
    fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable embedding cache {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string(self).context("Failed to serialize embedding cache")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write embedding cache: {}", path.display()))?;
        Ok(())
    }

    fn lookup(&self, key: &str, text: &str) -> Option<Vec<f32>> {
        self.entries
            .get(key)
            .filter(|cached| cached.text == text)
            .map(|cached| cached.embedding.clone())
    }

    fn insert(&mut self, key: String, text: String, embedding: Vec<f32>) {
        self.entries.insert(key, CachedEmbedding { text, embedding });
    }
}

/// Show the active configuration.
#[inline]
pub fn show_config() -> Result<()> {
    let config_dir = get_config_dir().context("Failed to resolve config directory")?;
    let config = Config::load(&config_dir)?;

    println!("Config file: {}", config.config_file_path().display());
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Write the default configuration file if none exists yet.
#[inline]
pub fn init_config() -> Result<()> {
    let config_dir = get_config_dir().context("Failed to resolve config directory")?;
    let config = Config::load(&config_dir)?;

    if config.config_file_path().exists() {
        println!(
            "Config file already exists: {}",
            config.config_file_path().display()
        );
        return Ok(());
    }

    config.save()?;
    println!("Wrote {}", config.config_file_path().display());
    Ok(())
}

/// Load a fixture, embed its records through the configured embedding
/// service, and run a semantic search against it.
#[inline]
pub async fn run_search(query: &str, fixture_path: &Path, limit: Option<usize>) -> Result<()> {
    let config_dir = get_config_dir().context("Failed to resolve config directory")?;
    let config = Config::load(&config_dir)?;

    let embedder = HttpEmbedder::new(&config.embedder)
        .map_err(|e| anyhow::anyhow!("Failed to create embedding client: {}", e))?;
    embedder
        .health_check()
        .map_err(|e| anyhow::anyhow!("Embedding service is unavailable: {}", e))?;

    let fixture = load_fixture(fixture_path)?;
    println!(
        "Loaded {} tasks and {} messages from {}",
        fixture.tasks.len(),
        fixture.messages.len(),
        fixture_path.display()
    );

    let index = populate_index(fixture, fixture_path, &embedder).await?;

    let engine = SearchEngine::new(
        Arc::new(embedder),
        Arc::new(index.clone()),
        Arc::new(index),
        config.search.clone(),
    );

    let results = match limit {
        Some(limit) => engine.search_with_limit(query, limit).await?,
        None => engine.search(query).await?,
    };

    if results.is_empty() {
        println!("No matches for '{}'.", query);
        return Ok(());
    }

    println!();
    for (rank, result) in results.iter().enumerate() {
        print_result(rank + 1, result);
    }
    Ok(())
}

fn load_fixture(path: &Path) -> Result<Fixture> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixture: {}", path.display()))
}

fn cache_path(fixture_path: &Path) -> PathBuf {
    let mut file_name = fixture_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fixture".to_string());
    file_name.push_str(".embeddings.json");
    fixture_path.with_file_name(file_name)
}

/// Text submitted to the embedding collaborator for a task record.
fn task_embedding_text(task: &Task) -> String {
    match &task.description {
        Some(description) => format!("{}\n{}", task.name, description),
        None => task.name.clone(),
    }
}

async fn populate_index(
    fixture: Fixture,
    fixture_path: &Path,
    embedder: &HttpEmbedder,
) -> Result<MemoryIndex> {
    let cache_path = cache_path(fixture_path);
    let mut cache = EmbeddingCache::load(&cache_path);
    let mut embedded = 0_usize;

    let progress = ProgressBar::new((fixture.tasks.len() + fixture.messages.len()) as u64);
    progress.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .context("Invalid progress bar template")?,
    );
    progress.set_message("Embedding records");

    let index = MemoryIndex::new();

    for mut task in fixture.tasks {
        if task.embedding.is_none() {
            let text = task_embedding_text(&task);
            let key = format!("task:{}", task.id);
            task.embedding = Some(match cache.lookup(&key, &text) {
                Some(embedding) => embedding,
                None => {
                    let embedding = embedder
                        .embed(&text)
                        .map_err(|e| anyhow::anyhow!("Failed to embed task {}: {}", task.id, e))?;
                    cache.insert(key, text, embedding.clone());
                    embedded += 1;
                    embedding
                }
            });
        }
        index.insert_task(task).await;
        progress.inc(1);
    }

    for mut message in fixture.messages {
        if message.embedding.is_none() {
            let key = format!("message:{}", message.id);
            message.embedding = Some(match cache.lookup(&key, &message.content) {
                Some(embedding) => embedding,
                None => {
                    let embedding = embedder.embed(&message.content).map_err(|e| {
                        anyhow::anyhow!("Failed to embed message {}: {}", message.id, e)
                    })?;
                    cache.insert(key, message.content.clone(), embedding.clone());
                    embedded += 1;
                    embedding
                }
            });
        }
        index.insert_message(message).await;
        progress.inc(1);
    }

    progress.finish_and_clear();

    if embedded > 0 {
        cache.save(&cache_path)?;
        info!("Embedded {} new records, cache at {}", embedded, cache_path.display());
    } else {
        debug!("All embeddings served from cache at {}", cache_path.display());
    }

    Ok(index)
}

fn print_result(rank: usize, result: &RankedTask) {
    let source = match result.match_source {
        MatchSource::Task => style("task").green(),
        MatchSource::Message => style("message").cyan(),
        MatchSource::TaskAndMessage => style("task+message").yellow(),
    };

    println!(
        "{} {} {}",
        style(format!("{rank}.")).bold(),
        style(&result.name).bold(),
        style(format!(
            "[{}] (distance {:.4}, via {})",
            result.category, result.best_distance, source
        ))
        .dim(),
    );

    if let Some(snippet) = &result.task_snippet {
        println!("   {}", snippet);
    }

    if let Some(messages) = &result.relevant_messages {
        for message in messages {
            println!(
                "   {} {}",
                style(format!("({:.4})", message.distance)).dim(),
                message.snippet
            );
        }
    }
    println!();
}

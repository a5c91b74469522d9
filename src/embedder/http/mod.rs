
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::EmbedderConfig;
use crate::embedder::{EmbedError, Embedder};

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Client for an Ollama-compatible embedding service.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl HttpEmbedder {
    #[inline]
    pub fn new(config: &EmbedderConfig) -> Result<Self, EmbedError> {
        let base_url = config
            .url()
            .map_err(|e| EmbedError::Service(format!("Invalid embedder URL: {}", e)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Check that the service is reachable and the configured model exists.
    #[inline]
    pub fn health_check(&self) -> Result<(), EmbedError> {
        debug!("Performing embedder health check at {}", self.base_url);

        self.ping()?;
        self.validate_model()?;

        debug!(
            "Health check passed for embedding service at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// Ping the embedding service to check that it is responsive.
    #[inline]
    pub fn ping(&self) -> Result<(), EmbedError> {
        let url = self.endpoint("/api/tags")?;
        debug!("Pinging embedding service at {}", url);

        self.request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        Ok(())
    }

    /// Verify that the configured model is available on the service.
    #[inline]
    pub fn validate_model(&self) -> Result<(), EmbedError> {
        let models = self.list_models()?;

        if models.iter().any(|m| m.name == self.model) {
            debug!("Model {} is available", self.model);
            Ok(())
        } else {
            let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available
            );
            Err(EmbedError::Service(format!(
                "Model '{}' is not available. Available models: {:?}",
                self.model, available
            )))
        }
    }

    /// List all models available on the service.
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>, EmbedError> {
        let url = self.endpoint("/api/tags")?;

        let response_text = self.request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| EmbedError::InvalidResponse(format!("Failed to parse models: {}", e)))?;

        Ok(models_response.models)
    }

    fn endpoint(&self, path: &str) -> Result<Url, EmbedError> {
        self.base_url
            .join(path)
            .map_err(|e| EmbedError::Service(format!("Failed to build URL for {}: {}", path, e)))
    }

    fn request_with_retry<F>(&self, mut request_fn: F) -> Result<String, EmbedError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                            } else {
                                return Err(EmbedError::Service(format!(
                                    "Client error: HTTP {}",
                                    status
                                )));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                        }
                        _ => {
                            return Err(EmbedError::Service(format!(
                                "Non-retryable error: {}",
                                error
                            )));
                        }
                    }

                    last_error = Some(EmbedError::Service(format!("Request error: {}", error)));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        debug!("Waiting {}ms before retry", delay_ms);
                        std::thread::sleep(Duration::from_millis(delay_ms));
                    }
                }
            }
        }

        warn!("All retry attempts failed for request to {}", self.base_url);
        Err(last_error
            .unwrap_or_else(|| EmbedError::Service("Request failed after retries".to_string())))
    }
}

impl Embedder for HttpEmbedder {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| EmbedError::Service(format!("Failed to serialize request: {}", e)))?;

        let url = self.endpoint("/api/embed")?;

        let response_text = self.request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let embed_response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            EmbedError::InvalidResponse(format!("Failed to parse embedding: {}", e))
        })?;

        if embed_response.embedding.is_empty() {
            return Err(EmbedError::InvalidResponse(
                "Service returned an empty embedding".to_string(),
            ));
        }

        debug!(
            "Generated embedding with {} dimensions",
            embed_response.embedding.len()
        );
        Ok(embed_response.embedding)
    }
}

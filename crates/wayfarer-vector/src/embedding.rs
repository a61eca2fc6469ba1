//! Embedding service trait and implementations.
//!
//! - `HttpEmbeddingService` calls an OpenAI-compatible `/embeddings` endpoint
//!   (OpenRouter by default) with linear back-off retries. This is the
//!   production embedding backend.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wayfarer_core::config::EmbeddingConfig;
use wayfarer_core::error::{Result, WayfarerError};

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors that capture
/// semantic meaning. Used for both ingestion (indexing) and retrieval (query).
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(&self, text: &str) -> impl std::future::Future<Output = Result<Vec<f32>>> + Send;

    /// Generate embeddings for several texts, preserving input order.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// Because `EmbeddingService::embed` returns `impl Future` it is not
/// object-safe. This trait uses boxed futures instead, allowing
/// `Arc<dyn DynEmbeddingService>` to be shared between the search engine,
/// the ingestion pipeline and the chat orchestrator.
///
/// A blanket implementation is provided so that every `EmbeddingService`
/// automatically implements `DynEmbeddingService`.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;

    /// Generate embeddings for several texts (boxed future).
    fn embed_batch_boxed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(self.embed(text))
    }

    fn embed_batch_boxed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(self.embed_batch(texts))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// HttpEmbeddingService - OpenAI-compatible embeddings endpoint
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Embedding client for OpenAI-compatible providers.
///
/// The API key is read once from the environment variable named in the
/// configuration. A missing key is not fatal at construction time: every
/// call then fails with [`WayfarerError::Auth`], which callers on the chat
/// path degrade to "no context".
#[derive(Clone)]
pub struct HttpEmbeddingService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
    max_retries: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for HttpEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingService")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl HttpEmbeddingService {
    /// Build a client from configuration, reading the API key from the environment.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!(
                env = %config.api_key_env,
                "Embedding API key not set; retrieval will be unavailable"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WayfarerError::Embedding(format!("HTTP client: {}", e)))?;

        info!(model = %config.model, base_url = %config.base_url, "Embedding client ready");
        Ok(Self::new(client, config, api_key))
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn new(client: reqwest::Client, config: &EmbeddingConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            dimensions: config.dimensions,
            max_retries: config.max_retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Delay before retrying after the given zero-based attempt.
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay * (attempt + 1)
    }

    async fn request_with_retry(&self, input: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut last_err = None;
        for attempt in 0..self.max_retries {
            match self.send_request(input).await {
                Ok(vectors) => return Ok(vectors),
                Err(e @ WayfarerError::Auth(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max = self.max_retries,
                        error = %e,
                        "Embedding request failed"
                    );
                    last_err = Some(e);
                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            WayfarerError::Embedding("all retries exhausted".to_string())
        }))
    }

    async fn send_request(&self, input: &[&str]) -> Result<Vec<Vec<f32>>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            WayfarerError::Auth("embedding API key is not configured".to_string())
        })?;

        let body = EmbedRequest {
            model: &self.model,
            input: input.to_vec(),
            encoding_format: "float",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| WayfarerError::Embedding(format!("HTTP error: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(WayfarerError::Auth(format!(
                "embedding provider rejected credentials ({})",
                status
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WayfarerError::Embedding(format!(
                "API returned {}: {}",
                status, text
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| WayfarerError::Embedding(format!("JSON parse error: {}", e)))?;

        let mut data = parsed.data;
        if data.len() != input.len() {
            return Err(WayfarerError::Embedding(format!(
                "expected {} embeddings, got {}",
                input.len(),
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        debug!(count = data.len(), "Received embeddings");
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

impl EmbeddingService for HttpEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(WayfarerError::Embedding("Cannot embed empty text".to_string()));
        }
        let mut vectors = self.request_with_retry(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| WayfarerError::Embedding("provider returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(WayfarerError::Embedding("Cannot embed empty text".to_string()));
        }
        let input: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.request_with_retry(&input).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic 384-dimensional vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs (similarity 1.0) while different inputs
/// are close to orthogonal. This allows testing retrieval thresholds without
/// a real model.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn hash_to_vector(text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(384);
        for i in 0..384 {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(WayfarerError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(Self::hash_to_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        384
    }
}

//! Embedding clients.
//!
//! [`OpenAIEmbeddings`] calls `POST {api_base}/embeddings` and retries
//! transient failures with exponential backoff:
//!
//! - HTTP 429 and 5xx → retry
//! - other 4xx → fail immediately
//! - network errors → retry
//!
//! [`embed_all`] splits a large input into batches and embeds several
//! batches at once, keeping the output aligned with the input.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use std::time::Duration;

/// Maps text to fixed-length vectors.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Identifier of the embedding model. Stored with every record so
    /// queries can check they use the same vector space.
    fn model_id(&self) -> &str;

    /// Embed `texts`, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("Empty embedding response".into()))
    }
}

/// Embed `texts` in batches of `batch_size`, at most `concurrency` batches
/// in flight.
///
/// # Errors
///
/// The first batch error, or [`AppError::Embedding`] if the service
/// returned a different number of vectors than it was sent.
pub async fn embed_all(
    client: &dyn EmbeddingClient,
    texts: &[String],
    batch_size: usize,
    concurrency: usize,
) -> Result<Vec<Vec<f32>>> {
    // Owned batches and boxed futures keep the combined future `Send`
    let requests: Vec<BoxFuture<'_, Result<Vec<Vec<f32>>>>> = texts
        .chunks(batch_size.max(1))
        .map(|batch| batch.to_vec())
        .map(|batch| {
            async move {
                let vectors = client.embed_batch(&batch).await?;
                if vectors.len() != batch.len() {
                    return Err(AppError::Embedding(format!(
                        "Expected {} embeddings, got {}",
                        batch.len(),
                        vectors.len()
                    )));
                }
                tracing::debug!(batch = batch.len(), "Embedded batch");
                Ok(vectors)
            }
            .boxed()
        })
        .collect();

    let batches: Vec<Vec<Vec<f32>>> = futures::stream::iter(requests)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(batches.into_iter().flatten().collect())
}

// ============================================================================
// OpenAI
// ============================================================================

pub struct OpenAIEmbeddings {
    http_client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_retries: u32,
    backoff_base: Duration,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbeddings {
    pub fn new(
        api_key: String,
        api_base: String,
        model: String,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(AppError::Configuration(
                "Embedding model name must not be empty".into(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the first retry delay (doubles on every further attempt).
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        // 1x, 2x, 4x, ... capped at 32x
        self.backoff_base * (1u32 << (attempt - 1).min(5))
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbeddings {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/embeddings", self.api_base);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying embedding request"
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .http_client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    last_err = Some(format!("HTTP request failed: {}", e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
                    AppError::Embedding(format!("Invalid embeddings response: {}", e))
                })?;
                let mut data = parsed.data;
                // Sort by index so vectors line up with the input
                data.sort_by_key(|d| d.index);
                return Ok(data.into_iter().map(|d| d.embedding).collect());
            }

            let text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                last_err = Some(format!("OpenAI API error {}: {}", status, text));
                continue;
            }

            return Err(AppError::Embedding(format!(
                "OpenAI API error {}: {}",
                status, text
            )));
        }

        Err(AppError::Embedding(last_err.unwrap_or_else(|| {
            "Embedding failed after retries".to_string()
        })))
    }
}

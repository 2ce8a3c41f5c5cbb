//! Pinecone vector database integration.
//!
//! Talks to the data plane of one index over REST. Every request carries
//! the `Api-Key` header; the namespace is passed per call.
//!
//! | Operation           | Endpoint                       |
//! |---------------------|--------------------------------|
//! | `upsert`            | `POST /vectors/upsert`         |
//! | `similarity_search` | `POST /query`                  |
//! | `delete_all`        | `POST /vectors/delete`         |
//! | `count`             | `POST /describe_index_stats`   |
//!
//! Record text is stored under the `text` metadata key next to `source`
//! and `model`.

use super::vectorstore::VectorIndex;
use crate::types::{AppError, ContextDocument, RecordMetadata, Result, VectorRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Pinecone caps upserts at 1000 vectors or 2MB per request.
const UPSERT_BATCH_SIZE: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PineconeIndex {
    http_client: reqwest::Client,
    host: String,
    api_key: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: PineconeMetadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PineconeMetadata {
    #[serde(default)]
    text: String,
    #[serde(default)]
    source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<PineconeMetadata>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    delete_all: bool,
    namespace: &'a str,
}

#[derive(Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

impl PineconeIndex {
    /// Create a client for the index served at `host`.
    ///
    /// A host without a scheme gets `https://`.
    pub fn new(host: &str, api_key: String) -> Result<Self> {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(AppError::Configuration(
                "Pinecone index host must not be empty".into(),
            ));
        }
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            host,
            api_key,
        })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<reqwest::Response, String> {
        let response = self
            .http_client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Pinecone {} failed ({}): {}", path, status, text));
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn provider_name(&self) -> &'static str {
        "pinecone"
    }

    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        let mut written = 0;

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|record| PineconeVector {
                        id: &record.id,
                        values: &record.embedding,
                        metadata: PineconeMetadata {
                            text: record.text.clone(),
                            source: record.metadata.source.clone(),
                            model: record.metadata.model.clone(),
                        },
                    })
                    .collect(),
                namespace,
            };

            let response = self
                .post("/vectors/upsert", &request)
                .await
                .map_err(AppError::IndexWrite)?;
            let body: UpsertResponse = response
                .json()
                .await
                .map_err(|e| AppError::IndexWrite(format!("Invalid upsert response: {}", e)))?;

            written += body.upserted_count.unwrap_or(batch.len());
            tracing::debug!(namespace, batch = batch.len(), "Upserted batch to Pinecone");
        }

        Ok(written)
    }

    async fn similarity_search(
        &self,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ContextDocument>> {
        let request = QueryRequest {
            namespace,
            vector: embedding,
            top_k,
            include_metadata: true,
            include_values: false,
        };

        let response = self
            .post("/query", &request)
            .await
            .map_err(AppError::IndexQuery)?;
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::IndexQuery(format!("Invalid query response: {}", e)))?;

        Ok(body
            .matches
            .into_iter()
            .map(|m| {
                let metadata = m.metadata.unwrap_or_default();
                ContextDocument {
                    id: m.id,
                    page_content: metadata.text,
                    metadata: RecordMetadata {
                        source: metadata.source,
                        model: metadata.model,
                    },
                    score: m.score,
                }
            })
            .collect())
    }

    async fn delete_all(&self, namespace: &str) -> Result<()> {
        let request = DeleteRequest {
            delete_all: true,
            namespace,
        };

        let response = self
            .http_client
            .post(format!("{}/vectors/delete", self.host))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::IndexWrite(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        // Pinecone answers 404 for a namespace that was never written
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(AppError::IndexWrite(format!(
            "Pinecone delete failed ({}): {}",
            status, text
        )))
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let response = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await
            .map_err(AppError::IndexQuery)?;
        let stats: IndexStats = response
            .json()
            .await
            .map_err(|e| AppError::IndexQuery(format!("Invalid stats response: {}", e)))?;

        Ok(stats
            .namespaces
            .get(namespace)
            .map(|ns| ns.vector_count)
            .unwrap_or(0))
    }
}

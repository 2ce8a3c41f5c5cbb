//! Vector Index Abstraction Layer
//!
//! The pipeline talks to its vector database through the [`VectorIndex`]
//! trait. Records live in namespaces; the pipeline only ever uses one.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                   VectorIndex Trait                    │
//! ├───────────────────────────────────────────────────────┤
//! │  upsert  │  similarity_search  │  delete_all  │ count │
//! └───────────────────────────────────────────────────────┘
//!          ▲                               ▲
//!    ┌─────┴──────┐                  ┌─────┴────┐
//!    │  InMemory  │                  │ Pinecone │
//!    │  (default) │                  │ (cloud)  │
//!    └────────────┘                  └──────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use sophia::db::vectorstore::VectorIndexProvider;
//!
//! let index = VectorIndexProvider::Memory.create_index().await?;
//! index.upsert("books", &records).await?;
//! let hits = index.similarity_search("books", &query_embedding, 4).await?;
//! ```

use crate::types::{AppError, ContextDocument, Result, VectorRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Vector Index Provider Configuration
// ============================================================================

/// Which backend to build, as written in the `[index]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum VectorIndexProvider {
    /// Process-local index. Contents are lost when the process exits.
    Memory,

    /// Pinecone serverless or pod index, addressed by its data-plane host.
    Pinecone {
        /// Index host, e.g. `https://books-abc123.svc.us-east-1.pinecone.io`.
        host: String,
        /// Name of the environment variable holding the API key.
        #[serde(default = "default_pinecone_api_key_env")]
        api_key_env: String,
    },
}

fn default_pinecone_api_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}

impl Default for VectorIndexProvider {
    fn default() -> Self {
        VectorIndexProvider::Memory
    }
}

impl VectorIndexProvider {
    /// Build the configured index.
    ///
    /// # Errors
    ///
    /// [`AppError::Configuration`] if a required secret is not set in the
    /// environment.
    pub async fn create_index(&self) -> Result<Arc<dyn VectorIndex>> {
        match self {
            VectorIndexProvider::Memory => Ok(Arc::new(InMemoryVectorIndex::new())),
            VectorIndexProvider::Pinecone { host, api_key_env } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::Configuration(format!(
                        "Environment variable '{}' for the Pinecone API key is not set",
                        api_key_env
                    ))
                })?;
                let index = super::pinecone::PineconeIndex::new(host, api_key)?;
                Ok(Arc::new(index))
            }
        }
    }
}

// ============================================================================
// Vector Index Trait
// ============================================================================

/// Namespaced store of `(text, metadata, vector)` records.
///
/// Ranking and the distance metric belong to the implementation; callers
/// only rely on results coming back most similar first.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Get the name of this index provider.
    fn provider_name(&self) -> &'static str;

    /// Insert or overwrite records by id.
    ///
    /// # Returns
    ///
    /// Number of records written.
    ///
    /// # Errors
    ///
    /// [`AppError::IndexWrite`] if the backend rejects the write.
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize>;

    /// Top `top_k` records nearest to `embedding`, most similar first.
    ///
    /// An empty or unknown namespace yields an empty list.
    ///
    /// # Errors
    ///
    /// [`AppError::IndexQuery`] if the backend is unreachable.
    async fn similarity_search(
        &self,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ContextDocument>>;

    /// Remove every record in `namespace`. Deleting an empty or unknown
    /// namespace succeeds.
    async fn delete_all(&self, namespace: &str) -> Result<()>;

    /// Number of records in `namespace`.
    async fn count(&self, namespace: &str) -> Result<usize>;
}

// ============================================================================
// In-Memory Vector Index
// ============================================================================

use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory index using cosine similarity. Used by default and in tests.
pub struct InMemoryVectorIndex {
    namespaces: RwLock<HashMap<String, HashMap<String, VectorRecord>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        if let Some(bad) = records.iter().find(|r| r.embedding.is_empty()) {
            return Err(AppError::IndexWrite(format!(
                "Record '{}' has no embedding",
                bad.id
            )));
        }

        let mut namespaces = self.namespaces.write();
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            entries.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn similarity_search(
        &self,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ContextDocument>> {
        let namespaces = self.namespaces.read();
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ContextDocument> = entries
            .values()
            .map(|record| ContextDocument {
                id: record.id.clone(),
                page_content: record.text.clone(),
                metadata: record.metadata.clone(),
                score: Self::cosine_similarity(embedding, &record.embedding),
            })
            .collect();

        // Ties broken by id so results are stable across runs
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    async fn delete_all(&self, namespace: &str) -> Result<()> {
        self.namespaces.write().remove(namespace);
        Ok(())
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        Ok(self
            .namespaces
            .read()
            .get(namespace)
            .map(|entries| entries.len())
            .unwrap_or(0))
    }
}

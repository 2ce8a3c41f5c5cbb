//! Query sanitizing and similarity retrieval.

use crate::db::vectorstore::VectorIndex;
use crate::rag::embeddings::EmbeddingClient;
use crate::types::{AppError, Result, RetrievedContext};
use std::sync::Arc;

/// Trim the query and replace every line break (`\r\n`, `\n`, `\r`) with a
/// single space. Idempotent.
pub fn sanitize_query(query: &str) -> String {
    query
        .trim()
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

/// Embeds a question and fetches its nearest records from one namespace.
pub struct Retriever {
    embeddings: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        embeddings: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        namespace: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embeddings,
            index,
            namespace: namespace.into(),
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Top-k records for an already sanitized query.
    ///
    /// Zero matches is not an error. Matches stamped with a different
    /// embedding model fail with [`AppError::VersionMismatch`].
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext> {
        let embedding = self.embeddings.embed_query(query).await?;
        let context = self
            .index
            .similarity_search(&self.namespace, &embedding, self.top_k)
            .await?;

        self.check_model(&context)?;

        tracing::debug!(
            namespace = %self.namespace,
            matches = context.len(),
            "Retrieved context"
        );
        Ok(context)
    }

    fn check_model(&self, context: &RetrievedContext) -> Result<()> {
        let expected = self.embeddings.model_id();
        let mut unstamped = 0;

        for doc in context {
            match doc.metadata.model.as_deref() {
                Some(found) if found != expected => {
                    return Err(AppError::VersionMismatch {
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
                Some(_) => {}
                None => unstamped += 1,
            }
        }

        if unstamped > 0 {
            tracing::warn!(
                namespace = %self.namespace,
                unstamped,
                "Retrieved records carry no embedding model; cannot verify vector space"
            );
        }
        Ok(())
    }
}

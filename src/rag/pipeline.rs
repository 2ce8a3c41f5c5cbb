//! Ingestion and query orchestration.
//!
//! [`RecommendationPipeline`] owns every collaborator it calls; nothing is
//! global. Both entrypoints return [`Result`], so a caller never has to look
//! inside a payload to tell success from failure.
//!
//! ```text
//! ingest:  file ─▶ loader ─▶ chunker ─▶ tokens + embeddings ─▶ index.upsert
//! query:   question ─▶ sanitize ─▶ retriever ─▶ prompt ─▶ llm.stream ─▶ parse/repair
//! ```

use crate::db::vectorstore::VectorIndex;
use crate::llm::client::{LLMClient, Provider};
use crate::llm::stream::{collect_stream, TokenObserver};
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::{embed_all, EmbeddingClient, OpenAIEmbeddings};
use crate::rag::loader::load_document;
use crate::rag::namespace::NamespaceLocks;
use crate::rag::output::parse_with_repair;
use crate::rag::prompt::build_prompt;
use crate::rag::retriever::{sanitize_query, Retriever};
use crate::rag::tokens::TokenCounter;
use crate::types::{
    AppError, Chunk, RecommendationResult, RecordMetadata, Result, RetrievedContext,
    SourceDocument, UpsertResult, VectorRecord,
};
use crate::utils::toml_config::{RagConfig, SophiaConfig};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Hex characters of the content hash kept in a record id.
const RECORD_HASH_LEN: usize = 16;

pub struct RecommendationPipeline {
    embeddings: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LLMClient>,
    retriever: Retriever,
    chunker: TextChunker,
    tokens: TokenCounter,
    locks: NamespaceLocks,
    namespace: String,
    embed_batch_size: usize,
    embed_concurrency: usize,
}

impl RecommendationPipeline {
    /// Assemble a pipeline from already built clients.
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidInput`] for an invalid chunk budget, or
    /// [`AppError::Internal`] if the tokenizer cannot be loaded.
    pub fn new(
        embeddings: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LLMClient>,
        rag: &RagConfig,
    ) -> Result<Self> {
        let chunker = TextChunker::new(rag.chunk_size, rag.chunk_overlap)?;
        let retriever = Retriever::new(
            embeddings.clone(),
            index.clone(),
            rag.namespace.clone(),
            rag.top_k,
        );

        Ok(Self {
            embeddings,
            index,
            llm,
            retriever,
            chunker,
            tokens: TokenCounter::new()?,
            locks: NamespaceLocks::new(),
            namespace: rag.namespace.clone(),
            embed_batch_size: rag.embed_batch_size,
            embed_concurrency: rag.embed_concurrency,
        })
    }

    /// Build OpenAI clients and the configured index from `config`.
    pub async fn from_config(config: &SophiaConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.openai_api_key()?;
        let openai = &config.openai;

        let embeddings = OpenAIEmbeddings::new(
            api_key.clone(),
            openai.api_base.clone(),
            openai.embedding_model.clone(),
            openai.timeout_secs,
            openai.max_retries,
        )?;

        let provider = Provider::OpenAI {
            api_key,
            api_base: openai.api_base.clone(),
            model: openai.chat_model.clone(),
            temperature: openai.temperature,
            timeout_secs: openai.timeout_secs,
        };
        let llm = provider.create_client()?;

        let index = config.index.create_index().await?;

        tracing::info!(
            llm = provider.name(),
            index = index.provider_name(),
            namespace = %config.rag.namespace,
            embedding_model = %openai.embedding_model,
            chat_model = %openai.chat_model,
            "Pipeline initialized"
        );

        Self::new(Arc::new(embeddings), index, Arc::from(llm), &config.rag)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn embedding_model(&self) -> &str {
        self.embeddings.model_id()
    }

    pub fn chat_model(&self) -> &str {
        self.llm.model_name()
    }

    /// Number of records in the configured namespace. Doubles as a
    /// connectivity check against the index.
    pub async fn record_count(&self) -> Result<usize> {
        self.index.count(&self.namespace).await
    }

    // ============================================================================
    // Ingestion
    // ============================================================================

    /// Load, chunk, embed and upsert one tabular file.
    ///
    /// Either every record is written or an error is returned.
    pub async fn ingest(&self, path: &Path) -> Result<UpsertResult> {
        let start = Instant::now();

        let owned: PathBuf = path.to_path_buf();
        let document = tokio::task::spawn_blocking(move || load_document(&owned))
            .await
            .map_err(|e| AppError::Internal(format!("Loader task failed: {}", e)))??;

        let chunks = self.chunk_document(&document);
        if chunks.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "{} contains no text to index",
                path.display()
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_all(
            self.embeddings.as_ref(),
            &texts,
            self.embed_batch_size,
            self.embed_concurrency,
        )
        .await?;

        let model = self.embeddings.model_id().to_string();
        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, embedding)| VectorRecord {
                id: record_id(&chunk.source_id, &chunk.text),
                text: chunk.text.clone(),
                metadata: RecordMetadata {
                    source: chunk.source_id.clone(),
                    model: Some(model.clone()),
                },
                embedding,
            })
            .collect();

        let records_upserted = {
            let _guard = self.locks.ingest(&self.namespace).await;
            self.index.upsert(&self.namespace, &records).await?
        };

        let total_tokens = chunks.iter().map(|c| c.token_count).sum();

        tracing::info!(
            source = %document.id,
            namespace = %self.namespace,
            chunks = chunks.len(),
            records = records_upserted,
            total_tokens,
            duration_ms = start.elapsed().as_millis() as u64,
            "Document ingested"
        );

        Ok(UpsertResult {
            source_id: document.id,
            namespace: self.namespace.clone(),
            chunks: chunks.len(),
            records_upserted,
            total_tokens,
            embedding_model: model,
        })
    }

    /// Chunk a document's flattened text and count tokens per chunk.
    pub fn chunk_document(&self, document: &SourceDocument) -> Vec<Chunk> {
        self.chunker
            .split(&document.flatten())
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                index,
                token_count: self.tokens.count(&text),
                text,
                source_id: document.id.clone(),
            })
            .collect()
    }

    /// Remove every record in the configured namespace.
    pub async fn delete_all(&self) -> Result<()> {
        let _guard = self.locks.delete(&self.namespace).await;
        self.index.delete_all(&self.namespace).await?;

        tracing::info!(namespace = %self.namespace, "Namespace cleared");
        Ok(())
    }

    // ============================================================================
    // Query
    // ============================================================================

    /// Sanitize `question` and fetch its context without generating.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievedContext> {
        let question = sanitize_query(question);
        if question.is_empty() {
            return Err(AppError::InvalidInput("Question must not be empty".into()));
        }
        self.retriever.retrieve(&question).await
    }

    /// Answer `question` with three recommendations.
    ///
    /// Tokens of the main completion go to `observer` as they arrive.
    /// `cancel` is checked between stages and while streaming.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] for a blank question.
    /// - [`AppError::EmptyContext`] when nothing was retrieved; the model
    ///   is not called.
    /// - [`AppError::SchemaValidation`] when the answer is still invalid
    ///   after one repair.
    /// - [`AppError::Cancelled`], or any collaborator error.
    pub async fn query(
        &self,
        question: &str,
        observer: &dyn TokenObserver,
        cancel: &CancellationToken,
    ) -> Result<RecommendationResult> {
        let start = Instant::now();

        let question = sanitize_query(question);
        if question.is_empty() {
            return Err(AppError::InvalidInput("Question must not be empty".into()));
        }

        ensure_active(cancel)?;
        let context = self.retriever.retrieve(&question).await?;
        ensure_active(cancel)?;

        if context.is_empty() {
            tracing::info!(namespace = %self.namespace, "No context retrieved");
            return Err(AppError::EmptyContext(question));
        }

        let prompt = build_prompt(&context, &question);
        let tokens = self.llm.stream(&prompt).await?;
        let completion = collect_stream(tokens, observer, cancel).await?;

        let items = parse_with_repair(self.llm.as_ref(), &completion, cancel).await?;
        ensure_active(cancel)?;

        tracing::info!(
            namespace = %self.namespace,
            context = context.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Recommendation generated"
        );

        Ok(RecommendationResult {
            items,
            source_documents: context,
        })
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(AppError::Cancelled)
    } else {
        Ok(())
    }
}

/// `<source>-<hash>` where the hash covers source and text, so the same
/// chunk always maps to the same id.
pub fn record_id(source: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}", source, &digest[..RECORD_HASH_LEN])
}

//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod mocks;

use mocks::{MockEmbeddingClient, MockLLMClient};
use sophia::db::vectorstore::{InMemoryVectorIndex, VectorIndex};
use sophia::rag::RecommendationPipeline;
use sophia::utils::toml_config::RagConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const EMBEDDING_MODEL: &str = "mock-embedding-v1";

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A small philosophy catalog as CSV.
pub fn catalog_csv() -> &'static str {
    "title,author,summary\n\
     Ethics,Baruch Spinoza,God or Nature and the geometry of the passions\n\
     The Concept of Mind,Gilbert Ryle,Category mistakes and the ghost in the machine\n\
     Meditations,Marcus Aurelius,Stoic notes on duty and impermanence\n\
     「昭和」を送る,中井久夫,精神科医が見た昭和という時代\n"
}

pub struct Harness {
    pub pipeline: RecommendationPipeline,
    pub index: Arc<InMemoryVectorIndex>,
    pub embeddings: Arc<MockEmbeddingClient>,
    pub llm: Arc<MockLLMClient>,
}

/// Pipeline over an in-memory index and mock clients.
pub fn harness(llm: MockLLMClient, rag: RagConfig) -> Harness {
    harness_with(
        llm,
        rag,
        Arc::new(MockEmbeddingClient::new(EMBEDDING_MODEL)),
        Arc::new(InMemoryVectorIndex::new()),
    )
}

pub fn harness_with(
    llm: MockLLMClient,
    rag: RagConfig,
    embeddings: Arc<MockEmbeddingClient>,
    index: Arc<InMemoryVectorIndex>,
) -> Harness {
    let llm = Arc::new(llm);
    let pipeline = RecommendationPipeline::new(
        embeddings.clone(),
        index.clone() as Arc<dyn VectorIndex>,
        llm.clone(),
        &rag,
    )
    .unwrap();

    Harness {
        pipeline,
        index,
        embeddings,
        llm,
    }
}

//! # Sophia - retrieval-augmented book recommendations
//!
//! Sophia ingests tabular book catalogs (spreadsheets, CSV/TSV) into a
//! namespaced vector index and answers free-text questions with exactly
//! three book recommendations, each grounded in retrieved catalog passages.
//!
//! ## Overview
//!
//! Sophia can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `sophia` binary
//! 2. **As a library** - Embed [`RecommendationPipeline`] in your own service
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use sophia::{RecommendationPipeline, SophiaConfig};
//! use sophia::llm::StdoutObserver;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = SophiaConfig::load("sophia.toml")?;
//! let pipeline = RecommendationPipeline::from_config(&config).await?;
//!
//! pipeline.ingest(std::path::Path::new("catalog.xlsx")).await?;
//! let result = pipeline
//!     .query("philosophy of mind", &StdoutObserver, &CancellationToken::new())
//!     .await?;
//! assert_eq!(result.items.len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line parsing and output
//! - [`db`] - Vector index abstraction (in-memory, Pinecone)
//! - [`llm`] - Completion clients and token streaming
//! - [`rag`] - Loader, chunker, retrieval, prompt, output repair, pipeline
//! - [`types`] - Data model and error handling
//! - [`utils`] - TOML configuration

#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Vector index clients.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (records, results, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{VectorIndex, VectorIndexProvider};
pub use llm::{LLMClient, Provider, TokenObserver};
pub use rag::RecommendationPipeline;
pub use types::{AppError, Result};
pub use utils::toml_config::SophiaConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Configuration the server was started with
    pub config: Arc<SophiaConfig>,
    /// The RAG pipeline all book endpoints call into
    pub pipeline: Arc<RecommendationPipeline>,
}

//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`loader`] - Spreadsheet and CSV/TSV loading
//! - [`chunker`] - Overlapping character-budget chunks
//! - [`tokens`] - `cl100k_base` token counts
//! - [`embeddings`] - Embedding clients (OpenAI) and batched embedding
//! - [`retriever`] - Query sanitizing and similarity retrieval
//! - [`prompt`] - The recommendation prompt
//! - [`output`] - Structured output parsing with one repair pass
//! - [`namespace`] - Ingest / delete-all coordination per namespace
//! - [`pipeline`] - Orchestrates all of the above
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Rows are flattened, chunked and embedded
//! 2. **Storage** - Records are upserted into the vector index namespace
//! 3. **Retrieval** - The question is embedded and the top-k chunks fetched
//! 4. **Generation** - The model streams an answer grounded in the chunks
//! 5. **Validation** - The answer must be exactly three books, or is repaired once
//!
//! # Example
//!
//! ```ignore
//! use sophia::rag::pipeline::RecommendationPipeline;
//! use sophia::llm::NoopObserver;
//!
//! let pipeline = RecommendationPipeline::from_config(&config).await?;
//! pipeline.ingest(Path::new("books.xlsx")).await?;
//! let result = pipeline.query("philosophy of mind", &NoopObserver, &cancel).await?;
//! ```

pub mod chunker;
pub mod embeddings;
pub mod loader;
pub mod namespace;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod tokens;

pub use pipeline::RecommendationPipeline;

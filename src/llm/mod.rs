//! Completion model clients.
//!
//! - [`LLMClient`] - the trait the pipeline calls
//! - [`openai::OpenAIClient`] - chat completions over HTTP with SSE streaming
//! - [`stream`] - token observers and the cancellable stream collector
//!
//! # Example
//!
//! ```ignore
//! use sophia::llm::{stream::{collect_stream, StdoutObserver}, Provider};
//!
//! let client = provider.create_client()?;
//! let tokens = client.stream("Recommend three books on Stoicism").await?;
//! let text = collect_stream(tokens, &StdoutObserver, &cancel).await?;
//! ```

/// Core LLM client trait and streaming types.
pub mod client;
pub mod openai;
pub mod stream;

pub use client::{LLMClient, Provider, TokenStream};
pub use stream::{collect_stream, NoopObserver, StdoutObserver, TokenObserver, TracingObserver};

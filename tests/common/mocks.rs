//! Mock implementations for testing.
//!
//! Mock embedding and LLM clients shared by the integration test files, so
//! the pipeline can run end to end without network access.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sophia::llm::client::{LLMClient, TokenStream};
use sophia::llm::stream::TokenObserver;
use sophia::rag::embeddings::EmbeddingClient;
use sophia::types::{AppError, Result};
use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Dimensions of the mock embedding space.
pub const MOCK_DIMENSIONS: usize = 256;

/// A schema-valid completion.
pub const VALID_COMPLETION: &str = r#"[
  {"title": "「昭和」を送る", "author": "中井久夫", "reason": "A psychiatrist reflects on an era"},
  {"title": "Ethics", "author": "Baruch Spinoza", "reason": "Mind and body as one substance"},
  {"title": "The Concept of Mind", "author": "Gilbert Ryle", "reason": "Against the ghost in the machine"}
]"#;

/// Bag-of-words embedding: every lowercase word is hashed into one of
/// [`MOCK_DIMENSIONS`] buckets. Texts sharing words end up close under
/// cosine similarity.
pub struct MockEmbeddingClient {
    model: String,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockEmbeddingClient {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("failing-model")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embed_text(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; MOCK_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() as usize) % MOCK_DIMENSIONS] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(AppError::Embedding("Mock embedding failure".to_string()));
        }
        Ok(texts.iter().map(|t| Self::embed_text(t)).collect())
    }
}

/// Mock LLM client with a fixed streamed answer and a queue of answers for
/// one-shot `generate` calls (used by the repair pass).
pub struct MockLLMClient {
    stream_response: String,
    generate_responses: Mutex<VecDeque<String>>,
    should_fail: bool,
    stream_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLLMClient {
    /// Create a new mock client that streams the given response.
    pub fn new(stream_response: &str) -> Self {
        Self {
            stream_response: stream_response.to_string(),
            generate_responses: Mutex::new(VecDeque::new()),
            should_fail: false,
            stream_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue answers returned by successive `generate` calls.
    pub fn with_repairs(self, responses: &[&str]) -> Self {
        *self.generate_responses.lock() = responses.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        self.generate_responses
            .lock()
            .pop_front()
            .ok_or_else(|| AppError::LLM("No scripted repair response".to_string()))
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }

        // Split into small pieces to exercise token assembly
        let chars: Vec<char> = self.stream_response.chars().collect();
        let tokens: Vec<Result<String>> = chars
            .chunks(7)
            .map(|piece| Ok(piece.iter().collect()))
            .collect();
        Ok(Box::new(futures::stream::iter(tokens)))
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

/// Records every token it observes.
#[derive(Default)]
pub struct RecordingObserver {
    tokens: Mutex<Vec<String>>,
    completed: Mutex<Option<String>>,
}

impl RecordingObserver {
    pub fn token_count(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn joined(&self) -> String {
        self.tokens.lock().concat()
    }

    pub fn completed(&self) -> Option<String> {
        self.completed.lock().clone()
    }
}

impl TokenObserver for RecordingObserver {
    fn on_token(&self, token: &str) {
        self.tokens.lock().push(token.to_string());
    }

    fn on_complete(&self, text: &str) {
        *self.completed.lock() = Some(text.to_string());
    }
}

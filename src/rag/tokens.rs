//! Token counting for ingestion cost reporting.

use crate::types::{AppError, Result};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Counts `cl100k_base` tokens, the encoding used by the OpenAI embedding
/// and GPT-4 models. Cheap to clone.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| AppError::Internal(format!("Failed to load cl100k_base: {}", e)))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("encoding", &"cl100k_base")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_is_deterministic() {
        let counter = TokenCounter::new().unwrap();
        let text = "Meditations Marcus Aurelius\nThe Republic Plato";
        assert_eq!(counter.count(text), counter.count(text));
        assert!(counter.count(text) > 0);
    }

    #[test]
    fn test_empty_text_has_no_tokens() {
        assert_eq!(TokenCounter::new().unwrap().count(""), 0);
    }

    #[test]
    fn test_known_count() {
        // "hello world" is two tokens in cl100k_base
        assert_eq!(TokenCounter::new().unwrap().count("hello world"), 2);
    }
}

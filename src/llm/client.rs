//! LLM client abstraction
//!
//! The pipeline only needs two things from a completion model: a one-shot
//! completion (used by the output repair pass) and a token stream (used
//! for the main answer so tokens can be shown as they arrive).

use crate::types::{AppError, Result};
use async_trait::async_trait;

/// Incremental completion text, in arrival order.
pub type TokenStream = Box<dyn futures::Stream<Item = Result<String>> + Send + Unpin>;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Stream a completion
    async fn stream(&self, prompt: &str) -> Result<TokenStream>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI chat-completions API (or any compatible endpoint)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4-1106-preview".to_string(),
    ///     temperature: 1.0,
    ///     timeout_secs: 120,
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        temperature: f32,
        timeout_secs: u64,
    },
}

impl Provider {
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                temperature,
                timeout_secs,
            } => {
                if model.trim().is_empty() {
                    return Err(AppError::Configuration(
                        "Chat model name must not be empty".into(),
                    ));
                }
                Ok(Box::new(super::openai::OpenAIClient::new(
                    api_key.clone(),
                    api_base.clone(),
                    model.clone(),
                    *temperature,
                    *timeout_secs,
                )?))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
        }
    }
}

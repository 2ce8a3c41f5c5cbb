use crate::llm::client::{LLMClient, TokenStream};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;

/// Chat-completions client for the OpenAI API and compatible endpoints.
pub struct OpenAIClient {
    http_client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
}

/// One parsed line of a server-sent event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A non-empty content delta.
    Token(String),
    /// `data: [DONE]`
    Done,
    /// Comments, keep-alives, role-only deltas and anything else without text.
    Skip,
}

/// Remove the first complete line from `buffer` and decode it.
///
/// Returns `None` while no newline has arrived yet.
fn take_line(buffer: &mut Vec<u8>) -> Option<Result<String>> {
    let newline_pos = buffer.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
    Some(
        String::from_utf8(line)
            .map(|line| line.trim_end_matches('\n').to_string())
            .map_err(|_| AppError::LLM("Stream is not valid UTF-8".to_string())),
    )
}

/// Parse one line of an OpenAI chat-completions event stream.
///
/// # Errors
///
/// [`AppError::LLM`] if a `data:` payload is not valid JSON or carries an
/// `error` object.
pub fn parse_sse_line(line: &str) -> Result<SseEvent> {
    let line = line.trim_end_matches('\r');
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let payload = payload.trim();

    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }
    if payload.is_empty() {
        return Ok(SseEvent::Skip);
    }

    let json: Value = serde_json::from_str(payload)
        .map_err(|e| AppError::LLM(format!("Malformed stream event: {}", e)))?;

    if let Some(error) = json.get("error") {
        return Err(AppError::LLM(format!("OpenAI stream error: {}", error)));
    }

    match json
        .pointer("/choices/0/delta/content")
        .and_then(|v| v.as_str())
    {
        Some(content) if !content.is_empty() => Ok(SseEvent::Token(content.to_string())),
        _ => Ok(SseEvent::Skip),
    }
}

impl OpenAIClient {
    pub fn new(
        api_key: String,
        api_base: String,
        model: String,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            temperature,
        })
    }

    fn request_body(&self, prompt: &str, stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "stream": stream,
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLM(format!(
                "OpenAI request failed ({}): {}",
                status, text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self.send(&self.request_body(prompt, false)).await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Failed to parse response: {}", e)))?;

        json.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AppError::LLM("No response from OpenAI".to_string()))
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        let response = self.send(&self.request_body(prompt, true)).await?;
        let mut bytes = response.bytes_stream();

        let result_stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(AppError::LLM(format!("Stream error: {}", e)));
                        break;
                    }
                };
                buffer.extend_from_slice(&chunk);

                // Decode complete lines only; a partial line may end mid-character
                while let Some(line) = take_line(&mut buffer) {
                    let event = line.and_then(|line| parse_sse_line(&line));
                    match event {
                        Ok(SseEvent::Token(token)) => {
                            yield Ok(token);
                        }
                        Ok(SseEvent::Done) => break 'read,
                        Ok(SseEvent::Skip) => {}
                        Err(e) => {
                            yield Err(e);
                            break 'read;
                        }
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(result_stream)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

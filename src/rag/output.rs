//! Structured output parsing with one repair pass.
//!
//! A completion is accepted when it is JSON for exactly three objects, each
//! with non-empty string `title`, `author` and `reason` fields. Either the
//! bare array or an `{"items": [...]}` wrapper is accepted, optionally
//! inside a Markdown code fence.
//!
//! ```text
//!   completion ──parse──▶ ok ─────────────────────────────▶ items
//!        │
//!        └─ error ──repair call──▶ parse ──▶ ok ─────────▶ items
//!                                    │
//!                                    └─ error ─▶ SchemaValidation
//! ```

use crate::llm::client::LLMClient;
use crate::types::{AppError, RecommendationItem, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Number of recommendations every answer must contain.
pub const EXPECTED_ITEMS: usize = 3;

const REQUIRED_FIELDS: [&str; 3] = ["title", "author", "reason"];

/// Output format instructions shared by the main prompt and the repair prompt.
pub fn format_instructions() -> String {
    format!(
        r#"The output should be a Markdown code snippet formatted as a JSON array of exactly {n} objects, following this schema:

```json
[
  {{
    "title": "The title of book",
    "author": "The author of book",
    "reason": "Recommend reason"
  }}
]
```

Every field is a required, non-empty string. Do not add any text before or after the JSON."#,
        n = EXPECTED_ITEMS
    )
}

/// Parse and validate a completion.
///
/// # Errors
///
/// [`AppError::SchemaValidation`] describing the first violation found.
pub fn parse_recommendations(text: &str) -> Result<Vec<RecommendationItem>> {
    let json = extract_json(text)?;

    let items = match json {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AppError::SchemaValidation(
                    "Expected a JSON array or an object with an \"items\" array".into(),
                ))
            }
        },
        _ => {
            return Err(AppError::SchemaValidation(
                "Expected a JSON array of recommendations".into(),
            ))
        }
    };

    if items.len() != EXPECTED_ITEMS {
        return Err(AppError::SchemaValidation(format!(
            "Expected exactly {} recommendations, got {}",
            EXPECTED_ITEMS,
            items.len()
        )));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_item(i, item))
        .collect()
}

fn parse_item(position: usize, item: &Value) -> Result<RecommendationItem> {
    let object = item.as_object().ok_or_else(|| {
        AppError::SchemaValidation(format!("Item {} is not a JSON object", position))
    })?;

    let mut fields = Vec::with_capacity(REQUIRED_FIELDS.len());
    for field in REQUIRED_FIELDS {
        let value = match object.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) => {
                return Err(AppError::SchemaValidation(format!(
                    "Item {}: \"{}\" is empty",
                    position, field
                )))
            }
            Some(_) => {
                return Err(AppError::SchemaValidation(format!(
                    "Item {}: \"{}\" must be a string",
                    position, field
                )))
            }
            None => {
                return Err(AppError::SchemaValidation(format!(
                    "Item {}: missing \"{}\"",
                    position, field
                )))
            }
        };
        fields.push(value);
    }

    let mut fields = fields.into_iter();
    Ok(RecommendationItem {
        title: fields.next().unwrap_or_default(),
        author: fields.next().unwrap_or_default(),
        reason: fields.next().unwrap_or_default(),
    })
}

/// Pull the JSON payload out of a completion.
fn extract_json(text: &str) -> Result<Value> {
    let body = strip_code_fence(text.trim());
    if let Ok(value) = serde_json::from_str(body) {
        return Ok(value);
    }

    // Tolerate prose around the payload: take the outermost bracketed span
    let start = body.find(['[', '{']);
    let end = body.rfind([']', '}']);
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&body[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(AppError::SchemaValidation(format!(
        "Completion is not valid JSON: {}",
        truncate(text, 200)
    )))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    // Skip the language tag line (```json)
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// Prompt asking the model to rewrite `completion` so it satisfies the
/// format instructions.
pub fn repair_prompt(completion: &str, error: &AppError) -> String {
    format!(
        "Instructions:\n--------------\n{}\n--------------\nCompletion:\n--------------\n{}\n--------------\n\n\
         Above, the Completion did not satisfy the constraints given in the Instructions.\n\
         Error:\n--------------\n{}\n--------------\n\n\
         Please try again. Only respond with an answer that satisfies the constraints laid out in the Instructions. \
         Keep every title and author exactly as written in the Completion.",
        format_instructions(),
        completion,
        error
    )
}

/// Parse `completion`; on failure make one repair call through `llm` and
/// parse its answer.
///
/// # Errors
///
/// - [`AppError::SchemaValidation`] if the repaired output is still invalid.
/// - [`AppError::Cancelled`] if `cancel` fired before the repair call.
/// - Any error of the repair call itself.
pub async fn parse_with_repair(
    llm: &dyn LLMClient,
    completion: &str,
    cancel: &CancellationToken,
) -> Result<Vec<RecommendationItem>> {
    let error = match parse_recommendations(completion) {
        Ok(items) => return Ok(items),
        Err(e) => e,
    };

    if cancel.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    tracing::warn!(error = %error, "Completion failed validation; attempting repair");
    let repaired = llm.generate(&repair_prompt(completion, &error)).await?;

    parse_recommendations(&repaired).map_err(|e| {
        tracing::warn!(error = %e, "Repaired completion failed validation");
        AppError::SchemaValidation(format!("Output still invalid after repair: {}", e))
    })
}

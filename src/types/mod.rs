use serde::{Deserialize, Serialize};

// ============= Ingestion Types =============

/// One spreadsheet row: `(column, value)` pairs in column order.
///
/// Blank cells are not stored, so a row only carries the columns it
/// actually has values for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<(String, String)>,
}

impl Row {
    /// Value for `column`, if the row has one.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Cell values in column order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A tabular file after parsing.
///
/// `id` is the file name without its extension and becomes the `source`
/// metadata of every record produced from this document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub rows: Vec<Row>,
}

impl SourceDocument {
    /// Flatten rows into one text blob: the values of a row joined by a
    /// single space, rows joined by a newline.
    pub fn flatten(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.values().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A bounded span of a document's flattened text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub token_count: usize,
    pub source_id: String,
}

/// Metadata stored next to every vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Source document id (file name without extension).
    pub source: String,
    /// Embedding model that produced the vector. Absent on records written
    /// by older ingestions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A (text, metadata, vector) triple as written to the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub metadata: RecordMetadata,
    pub embedding: Vec<f32>,
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResult {
    pub source_id: String,
    pub namespace: String,
    pub chunks: usize,
    pub records_upserted: usize,
    pub total_tokens: usize,
    pub embedding_model: String,
}

// ============= Retrieval Types =============

/// A record returned by similarity search, without its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDocument {
    pub id: String,
    pub page_content: String,
    pub metadata: RecordMetadata,
    pub score: f32,
}

/// Top-k records for a query, most similar first.
pub type RetrievedContext = Vec<ContextDocument>;

// ============= Recommendation Types =============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub title: String,
    pub author: String,
    pub reason: String,
}

/// Answer to one question: exactly three items plus the context they were
/// generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub items: Vec<RecommendationItem>,
    pub source_documents: RetrievedContext,
}

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendRequest {
    #[serde(rename = "searchData", alias = "question")]
    pub search_data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub namespace: String,
    pub deleted: bool,
}

// ============= Error Types =============

/// Caller-facing classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Input,
    ExternalService,
    SchemaValidation,
    Configuration,
    Cancelled,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Vector index write error: {0}")]
    IndexWrite(String),

    #[error("Vector index query error: {0}")]
    IndexQuery(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Schema validation error: {0}")]
    SchemaValidation(String),

    #[error("No context retrieved for question: {0}")]
    EmptyContext(String),

    #[error("Embedding model mismatch: index was written with '{found}', queries use '{expected}'")]
    VersionMismatch { expected: String, found: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::NotFound(_) | AppError::InvalidInput(_) => ErrorCategory::Input,
            AppError::Embedding(_)
            | AppError::IndexWrite(_)
            | AppError::IndexQuery(_)
            | AppError::LLM(_) => ErrorCategory::ExternalService,
            AppError::SchemaValidation(_) | AppError::EmptyContext(_) => {
                ErrorCategory::SchemaValidation
            }
            // Index and query embedding models disagree; fixed by configuration
            AppError::VersionMismatch { .. } | AppError::Configuration(_) => {
                ErrorCategory::Configuration
            }
            AppError::Cancelled => ErrorCategory::Cancelled,
            AppError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Embedding(_)
            | AppError::IndexWrite(_)
            | AppError::IndexQuery(_)
            | AppError::LLM(_) => StatusCode::BAD_GATEWAY,
            AppError::SchemaValidation(_) | AppError::EmptyContext(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::VersionMismatch { .. } => StatusCode::CONFLICT,
            // 499 is not in the registry; nginx uses it for client-closed requests
            AppError::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.category(),
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> Row {
        Row {
            cells: cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_flatten_joins_values_and_rows() {
        let doc = SourceDocument {
            id: "books".to_string(),
            rows: vec![
                row(&[("title", "Ethics"), ("author", "Spinoza")]),
                row(&[("title", "Being and Time"), ("author", "Heidegger")]),
            ],
        };

        assert_eq!(doc.flatten(), "Ethics Spinoza\nBeing and Time Heidegger");
    }

    #[test]
    fn test_row_get() {
        let r = row(&[("title", "Ethics")]);
        assert_eq!(r.get("title"), Some("Ethics"));
        assert_eq!(r.get("author"), None);
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            AppError::NotFound("x".into()).category(),
            ErrorCategory::Input
        );
        assert_eq!(
            AppError::IndexQuery("x".into()).category(),
            ErrorCategory::ExternalService
        );
        assert_eq!(
            AppError::SchemaValidation("x".into()).category(),
            ErrorCategory::SchemaValidation
        );
        assert_eq!(AppError::Cancelled.category(), ErrorCategory::Cancelled);
        assert_eq!(
            AppError::VersionMismatch {
                expected: "text-embedding-ada-002".into(),
                found: "text-embedding-3-small".into(),
            }
            .category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_result_serializes_source_documents_in_camel_case() {
        let result = RecommendationResult {
            items: vec![],
            source_documents: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("sourceDocuments").is_some());
    }

    #[test]
    fn test_recommend_request_accepts_question_alias() {
        let req: RecommendRequest =
            serde_json::from_str(r#"{"question": "free will"}"#).unwrap();
        assert_eq!(req.search_data, "free will");
    }
}

//! Book recommendation API handlers.
//!
//! Provides endpoints for:
//! - Recommendations for a free-text question
//! - Spreadsheet upload and ingestion
//! - Clearing the configured namespace

use crate::{
    llm::stream::TracingObserver,
    types::{
        AppError, DeleteResponse, RecommendRequest, RecommendationResult, Result, UpsertResult,
    },
    AppState,
};
use axum::{
    extract::{Multipart, State},
    Json,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

/// Sequence number for upload directories created by this process.
static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Recommend Endpoint
// ============================================================================

/// Answer a question with three books from the indexed catalog.
///
/// If the client disconnects, the request future is dropped and the query
/// stops at its next suspension point.
pub async fn recommend(
    State(state): State<AppState>,
    Json(payload): Json<RecommendRequest>,
) -> Result<Json<RecommendationResult>> {
    let start = Instant::now();

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let result = state
        .pipeline
        .query(&payload.search_data, &TracingObserver, &cancel)
        .await?;

    tracing::info!(
        items = result.items.len(),
        sources = result.source_documents.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Recommendation served"
    );

    Ok(Json(result))
}

// ============================================================================
// Upload Endpoint
// ============================================================================

/// Store an uploaded spreadsheet under `<upload_dir>/<millis>/<name>` and
/// ingest it.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UpsertResult>> {
    let mut stored: Option<PathBuf> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .and_then(safe_file_name)
            .ok_or_else(|| AppError::InvalidInput("Uploaded file has no usable name".into()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?;

        let dir = state
            .config
            .server
            .upload_dir
            .join(upload_dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;

        let path = dir.join(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {}", e)))?;

        tracing::info!(file = %path.display(), bytes = bytes.len(), "Upload stored");
        stored = Some(path);
        break;
    }

    let path = stored.ok_or_else(|| {
        AppError::InvalidInput(format!("Missing multipart field '{}'", UPLOAD_FIELD))
    })?;

    let result = state.pipeline.ingest(&path).await?;
    Ok(Json(result))
}

/// `<millis>-<seq>`, unique within this process.
fn upload_dir_name() -> String {
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Keep only the final path component of a client-supplied file name.
fn safe_file_name(name: &str) -> Option<String> {
    // Browsers on Windows may send the full client path
    let last = name.rsplit(['/', '\\']).next()?;
    let name = Path::new(last).file_name()?.to_str()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

// ============================================================================
// Delete Endpoint
// ============================================================================

/// Delete every record in the configured namespace.
pub async fn delete_data(State(state): State<AppState>) -> Result<Json<DeleteResponse>> {
    state.pipeline.delete_all().await?;

    Ok(Json(DeleteResponse {
        namespace: state.pipeline.namespace().to_string(),
        deleted: true,
    }))
}

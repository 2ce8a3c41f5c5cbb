use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Liveness plus a record count for the configured namespace.
///
/// The server is reported up even if the index cannot be reached; the
/// failure shows up in `index.error`.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let pipeline = &state.pipeline;

    let index = match pipeline.record_count().await {
        Ok(records) => json!({
            "provider": pipeline.index().provider_name(),
            "namespace": pipeline.namespace(),
            "records": records,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Vector index unreachable");
            json!({
                "provider": pipeline.index().provider_name(),
                "namespace": pipeline.namespace(),
                "error": e.to_string(),
            })
        }
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "embedding_model": pipeline.embedding_model(),
        "chat_model": pipeline.chat_model(),
        "index": index,
    }))
}

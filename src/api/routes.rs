use crate::api::handlers::{book, health};
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Routes mounted under `/api`.
pub fn create_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/book/recommend", post(book::recommend))
        .route(
            "/book/upload",
            post(book::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/book/data", delete(book::delete_data))
        // Paths used by existing frontends
        .route("/book/recommendBook", post(book::recommend))
        .route("/book/deleteData", delete(book::delete_data))
}

/// The complete application: API routes, health check, CORS, request
/// tracing and a global body limit.
pub fn build_app(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", create_router(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

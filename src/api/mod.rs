//! HTTP API Handlers and Routes
//!
//! A thin axum layer over [`RecommendationPipeline`](crate::rag::RecommendationPipeline).
//!
//! # API Endpoints
//!
//! ## Books (`/api/book`)
//! - `POST /api/book/recommend` - `{"searchData": "..."}` → three recommendations
//! - `POST /api/book/upload` - multipart field `file` → ingestion summary
//! - `DELETE /api/book/data` - clear the configured namespace
//!
//! `POST /api/book/recommendBook` and `DELETE /api/book/deleteData` are
//! served as aliases of `recommend` and `data`.
//!
//! ## Health
//! - `GET /health` - liveness and index record count
//!
//! Errors are returned as `{"error": "...", "kind": "..."}` with a status
//! code derived from the error kind.

/// Request handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

pub use routes::build_app;

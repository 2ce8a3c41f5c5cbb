//! API request handlers.

/// Recommendation, upload and delete handlers.
pub mod book;
/// Liveness and index connectivity.
pub mod health;

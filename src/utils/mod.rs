//! Configuration utilities.

/// TOML configuration (`sophia.toml`).
pub mod toml_config;

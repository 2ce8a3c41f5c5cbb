//! TOML-based configuration for Sophia
//!
//! Everything the server and the CLI need is read from one file
//! (`sophia.toml`). Secrets are never stored in the file: the config names
//! the environment variable that holds each key, and the key is resolved
//! when a client is built.

use crate::db::vectorstore::VectorIndexProvider;
use crate::rag::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from sophia.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SophiaConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Vector index backend
    #[serde(default)]
    pub index: VectorIndexProvider,

    #[serde(default)]
    pub rag: RagConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Uploaded spreadsheets are kept under `<upload_dir>/<millis>/<name>`
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

// ============= OpenAI Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Environment variable holding the API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base")]
    pub api_base: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient embedding failures (429, 5xx, network)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_chat_model() -> String {
    "gpt-4-1106-preview".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_api_key_env(),
            api_base: default_openai_base(),
            embedding_model: default_embedding_model(),
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Maximum characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters repeated at the start of every chunk after the first
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Passages retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    /// Embedding batches in flight at once
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,
}

fn default_namespace() -> String {
    "books".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_top_k() -> usize {
    4
}

fn default_embed_batch_size() -> usize {
    64
}

fn default_embed_concurrency() -> usize {
    4
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            embed_batch_size: default_embed_batch_size(),
            embed_concurrency: default_embed_concurrency(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl SophiaConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: SophiaConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Check value ranges. Environment variables are not required here;
    /// they are resolved when clients are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rag = &self.rag;

        if rag.namespace.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "rag.namespace must not be empty".into(),
            ));
        }
        if rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.chunk_size must be greater than 0".into(),
            ));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if !(1..=100).contains(&rag.top_k) {
            return Err(ConfigError::ValidationError(format!(
                "rag.top_k must be between 1 and 100, got {}",
                rag.top_k
            )));
        }
        if rag.embed_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.embed_batch_size must be at least 1".into(),
            ));
        }
        if rag.embed_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "rag.embed_concurrency must be at least 1".into(),
            ));
        }

        let openai = &self.openai;
        if openai.embedding_model.trim().is_empty() || openai.chat_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "openai.embedding_model and openai.chat_model must not be empty".into(),
            ));
        }
        if !(0.0..=2.0).contains(&openai.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "openai.temperature must be between 0 and 2, got {}",
                openai.temperature
            )));
        }

        if let VectorIndexProvider::Pinecone { host, .. } = &self.index {
            if host.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "index.host must be set for the pinecone provider".into(),
                ));
            }
        }

        Ok(())
    }

    /// Fail unless the index outlives this process.
    ///
    /// One-shot CLI commands against the in-memory index would ingest into,
    /// query, or clear a store that is empty on every run.
    pub fn require_persistent_index(&self, command: &str) -> Result<(), AppError> {
        if self.index == VectorIndexProvider::Memory {
            return Err(AppError::Configuration(format!(
                "`{}` needs a persistent index; set [index] provider = \"pinecone\" (the memory index only lives inside `serve`)",
                command
            )));
        }
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get the OpenAI API key from the environment
    pub fn openai_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.openai.api_key_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.openai.api_key_env.clone()))
    }

    /// Environment variables this configuration reads secrets from
    pub fn required_env_vars(&self) -> Vec<&str> {
        let mut vars = vec![self.openai.api_key_env.as_str()];
        if let VectorIndexProvider::Pinecone { api_key_env, .. } = &self.index {
            vars.push(api_key_env.as_str());
        }
        vars
    }

    /// Render the effective configuration, defaults included
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

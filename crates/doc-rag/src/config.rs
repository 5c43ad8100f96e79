//! Configuration for the retrieval pipeline

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval and context configuration
    pub retrieval: RetrievalConfig,
    /// Embedding/completion backend configuration
    pub llm: LlmConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file.
    ///
    /// Missing sections and keys fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be greater than 0"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be greater than 0"));
        }
        if self.retrieval.max_context_chars == 0 {
            return Err(Error::config("retrieval.max_context_chars must be greater than 0"));
        }
        if let Some(threshold) = self.retrieval.min_similarity_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(Error::config(format!(
                    "retrieval.min_similarity_threshold must lie in [-1, 1], got {}",
                    threshold
                )));
            }
        }
        if self.llm.backend == LlmBackend::OpenAi
            && self.llm.api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(Error::config("llm.api_key is required for the openai backend"));
        }
        Ok(())
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1024 }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nodes retrieved per query
    pub top_k: usize,
    /// Nodes scoring below this are left out of the context
    pub min_similarity_threshold: Option<f32>,
    /// Upper bound on the assembled context
    pub max_context_chars: usize,
    /// Bound on each embedding/completion call in seconds (0 disables)
    pub timeout_secs: u64,
}

impl RetrievalConfig {
    /// Timeout applied to upstream calls, if any
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            min_similarity_threshold: None,
            max_context_chars: 8000,
            timeout_secs: 120,
        }
    }
}

/// Which hosted API serves embeddings and completions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI-compatible API
    #[serde(alias = "open_ai")]
    OpenAi,
}

/// Embedding/completion backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend selection
    pub backend: LlmBackend,
    /// Base URL of the API
    pub base_url: String,
    /// API key (OpenAI backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Embedding dimensions reported by the model
    pub dimensions: usize,
    /// Temperature for generation
    pub temperature: f32,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl LlmConfig {
    /// Defaults for the OpenAI backend
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            backend: LlmBackend::OpenAi,
            base_url: "https://api.openai.com".to_string(),
            api_key: Some(api_key.into()),
            embed_model: "text-embedding-ada-002".to_string(),
            generate_model: "gpt-3.5-turbo".to_string(),
            dimensions: 1536,
            temperature: 0.1,
            ..Self::default()
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            dimensions: 768,
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

//! Ollama-based providers for embeddings and answer synthesis

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::embedding::EmbeddingProvider;
use super::llm::CompletionProvider;
use super::retry::RetryPolicy;
use super::status_error;

const SERVICE: &str = "ollama";

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
    /// Retry policy
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retry: RetryPolicy::new(config.max_retries),
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.url("/api/embeddings");
        let url = url.as_str();

        self.retry
            .run(|| async move {
                let request = EmbedRequest {
                    model: &self.config.embed_model,
                    prompt: text,
                };

                let response = self
                    .client
                    .post(url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::upstream(SERVICE, e))?;

                if !response.status().is_success() {
                    return Err(status_error(SERVICE, "Embedding", response).await);
                }

                let embed_response: EmbedResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::upstream(SERVICE, e))?;

                Ok(embed_response.embedding)
            })
            .await
    }

    /// Generate a completion for a prepared prompt with retry
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.url("/api/generate");
        let url = url.as_str();

        tracing::info!("Generating answer with model: {}", self.config.generate_model);

        self.retry
            .run(|| async move {
                let request = GenerateRequest {
                    model: &self.config.generate_model,
                    prompt,
                    stream: false,
                    options: GenerateOptions {
                        temperature: self.config.temperature,
                    },
                };

                let response = self
                    .client
                    .post(url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::upstream(SERVICE, e))?;

                if !response.status().is_success() {
                    return Err(status_error(SERVICE, "Generation", response).await);
                }

                let generate_response: GenerateResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::upstream(SERVICE, e))?;

                Ok(generate_response.response)
            })
            .await
    }
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self::from_client(Arc::new(OllamaClient::new(config)?), config.dimensions))
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize) -> Self {
        Self { client, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

/// Ollama LLM provider for answer synthesis
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self::from_client(
            Arc::new(OllamaClient::new(config)?),
            config.generate_model.clone(),
        ))
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl CompletionProvider for OllamaLlm {
    async fn complete(&self, query: &str, context: &str) -> Result<String> {
        let prompt = PromptBuilder::build_qa_prompt(query, context);
        self.client.generate(&prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        SERVICE
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Build an embedder and an LLM sharing a single Ollama client
pub fn ollama_pair(config: &LlmConfig) -> Result<(OllamaEmbedder, OllamaLlm)> {
    let client = Arc::new(OllamaClient::new(config)?);
    Ok((
        OllamaEmbedder::from_client(Arc::clone(&client), config.dimensions),
        OllamaLlm::from_client(client, config.generate_model.clone()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let config = LlmConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.url("/api/tags"), "http://localhost:11434/api/tags");
    }

    #[test]
    fn test_pair_reports_config() {
        let config = LlmConfig::default();
        let (embedder, llm) = ollama_pair(&config).unwrap();
        assert_eq!(embedder.dimensions(), 768);
        assert_eq!(llm.model(), "llama3.2:3b");
        assert_eq!(llm.name(), "ollama");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_upstream_error() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 0,
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let embedder = OllamaEmbedder::new(&config).unwrap();

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));
        assert!(!embedder.health_check().await.unwrap());
    }
}

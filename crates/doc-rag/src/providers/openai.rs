//! OpenAI-compatible providers for embeddings and chat completions

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

const SERVICE: &str = "openai";

/// OpenAI API client with automatic retry.
///
/// The API key comes from the configuration passed in; the client never
/// reads the environment.
pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new client; fails without an API key
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::config("llm.api_key is required for the openai backend"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            retry: RetryPolicy::new(config.max_retries),
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check that the API answers with the configured key
    pub async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.url("/v1/models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Embed a batch of texts in one request; output order follows input order
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url("/v1/embeddings");
        let url = url.as_str();

        let mut data = self
            .retry
            .run(|| async move {
                let request = EmbeddingRequest {
                    model: &self.config.embed_model,
                    input: texts,
                };

                let response = self
                    .client
                    .post(url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::upstream(SERVICE, e))?;

                if !response.status().is_success() {
                    return Err(status_error(SERVICE, "Embedding", response).await);
                }

                let parsed: EmbeddingResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::upstream(SERVICE, e))?;

                Ok(parsed.data)
            })
            .await?;

        if data.len() != texts.len() {
            return Err(Error::upstream(
                SERVICE,
                format!("requested {} embeddings, received {}", texts.len(), data.len()),
            ));
        }

        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    /// Run a chat completion for a prepared prompt
    pub async fn chat(&self, prompt: &str) -> Result<String> {
        let url = self.url("/v1/chat/completions");
        let url = url.as_str();

        tracing::info!("Generating answer with model: {}", self.config.generate_model);

        self.retry
            .run(|| async move {
                let request = ChatRequest {
                    model: &self.config.generate_model,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                    temperature: self.config.temperature,
                };

                let response = self
                    .client
                    .post(url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::upstream(SERVICE, e))?;

                if !response.status().is_success() {
                    return Err(status_error(SERVICE, "Generation", response).await);
                }

                let parsed: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::upstream(SERVICE, e))?;

                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| Error::upstream(SERVICE, "response contained no answer"))
            })
            .await
    }
}

/// OpenAI embedding provider
pub struct OpenAiEmbedder {
    client: Arc<OpenAiClient>,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create from existing OpenAiClient
    pub fn from_client(client: Arc<OpenAiClient>, dimensions: usize) -> Self {
        Self { client, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.client.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::upstream(SERVICE, "response contained no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(texts).await
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

/// OpenAI chat-completion provider for answer synthesis
pub struct OpenAiLlm {
    client: Arc<OpenAiClient>,
    model: String,
}

impl OpenAiLlm {
    /// Create from existing OpenAiClient
    pub fn from_client(client: Arc<OpenAiClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiLlm {
    async fn complete(&self, query: &str, context: &str) -> Result<String> {
        let prompt = PromptBuilder::build_qa_prompt(query, context);
        self.client.chat(&prompt).await
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

/// Build an embedder and an LLM sharing a single OpenAI client
pub fn openai_pair(config: &LlmConfig) -> Result<(OpenAiEmbedder, OpenAiLlm)> {
    let client = Arc::new(OpenAiClient::new(config)?);
    Ok((
        OpenAiEmbedder::from_client(Arc::clone(&client), config.dimensions),
        OpenAiLlm::from_client(client, config.generate_model.clone()),
    ))
}

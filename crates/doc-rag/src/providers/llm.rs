//! Completion provider trait for generating answers

use async_trait::async_trait;

use crate::error::Result;

/// Trait for LLM-based answer synthesis
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3.2, phi3, ...)
/// - `OpenAiLlm`: OpenAI-compatible chat completions
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Answer `query` using only `context`.
    ///
    /// `context` may be empty when no retrieved node qualified; the provider
    /// still answers, typically by saying the documents do not cover it.
    async fn complete(&self, query: &str, context: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

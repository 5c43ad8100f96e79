//! Provider abstractions for embeddings and answer synthesis
//!
//! Trait-based so the pipeline can switch between a local Ollama server and
//! an OpenAI-compatible API, and so tests can run without either.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod openai;
pub mod retry;

use std::sync::Arc;

use crate::config::{LlmBackend, LlmConfig};
use crate::error::{Error, HttpStatusError, Result};

pub use embedding::EmbeddingProvider;
pub use llm::CompletionProvider;
pub use retry::RetryPolicy;

/// Shared embedding and completion providers
pub type ProviderPair = (Arc<dyn EmbeddingProvider>, Arc<dyn CompletionProvider>);

/// Build the providers selected by the configuration.
///
/// Both providers share one HTTP client.
pub fn build_providers(config: &LlmConfig) -> Result<ProviderPair> {
    match config.backend {
        LlmBackend::Ollama => {
            let (embedder, llm) = ollama::ollama_pair(config)?;
            Ok((Arc::new(embedder), Arc::new(llm)))
        }
        LlmBackend::OpenAi => {
            let (embedder, llm) = openai::openai_pair(config)?;
            Ok((Arc::new(embedder), Arc::new(llm)))
        }
    }
}

/// Turn a non-success response into an upstream error carrying its status
pub(crate) async fn status_error(
    service: &str,
    operation: &'static str,
    response: reqwest::Response,
) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::upstream(
        service,
        HttpStatusError {
            operation,
            status,
            body,
        },
    )
}

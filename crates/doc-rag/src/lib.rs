//! doc-rag: retrieval-augmented question answering over documents
//!
//! Documents are extracted from files or web pages, split into sentence-packed
//! nodes, embedded through a pluggable embedding service and stored in an
//! in-memory vector index. Queries are embedded, matched by cosine similarity
//! and answered by a completion service conditioned on the retrieved text.
//!
//! ```no_run
//! use std::sync::Arc;
//! use doc_rag::{
//!     build_providers, IngestPipeline, QueryEngine, QueryOptions, RagConfig, SentenceChunker,
//!     SourceExtractor, VectorIndex,
//! };
//!
//! # async fn run() -> doc_rag::Result<()> {
//! let config = RagConfig::default();
//! let (embedder, completion) = build_providers(&config.llm)?;
//! let index = Arc::new(VectorIndex::new());
//!
//! let extractor = SourceExtractor::new(std::time::Duration::from_secs(30))?;
//! let pipeline = IngestPipeline::new(
//!     Arc::new(extractor),
//!     SentenceChunker::new(config.chunking.chunk_size)?,
//!     embedder.clone(),
//!     index.clone(),
//! );
//! pipeline.ingest("https://paulgraham.com/worked.html").await?;
//!
//! let engine = QueryEngine::new(index, embedder, completion, QueryOptions::from(&config.retrieval));
//! let result = engine.answer("What did the author do growing up?", config.retrieval.top_k).await?;
//! println!("{}", result.answer_text);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod query;
pub mod retrieval;
pub mod types;

pub use config::{LlmBackend, LlmConfig, RagConfig};
pub use error::{Error, Result};
pub use ingestion::{IngestPipeline, IngestReport, SentenceChunker, SourceExtractor, TextExtractor};
pub use providers::{build_providers, CompletionProvider, EmbeddingProvider};
pub use query::{QueryEngine, QueryOptions};
pub use retrieval::{ScoredNode, VectorIndex};
pub use types::{Citation, Document, Node, QueryResult};

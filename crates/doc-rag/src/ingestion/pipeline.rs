//! Ingestion pipeline orchestration

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::query::bounded;
use crate::retrieval::VectorIndex;
use crate::types::{Document, Node};

use super::chunker::SentenceChunker;
use super::extractor::TextExtractor;

/// Texts sent per `embed_batch` call
pub const EMBED_BATCH_SIZE: usize = 32;

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents chunked
    pub documents: usize,
    /// Nodes embedded and stored
    pub nodes: usize,
    /// Index dimensionality after the insert
    pub dimensions: Option<usize>,
}

/// Extract, chunk, embed and index documents
pub struct IngestPipeline {
    extractor: Arc<dyn TextExtractor>,
    chunker: SentenceChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    timeout: Option<Duration>,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        chunker: SentenceChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
    ) -> Self {
        Self {
            extractor,
            chunker,
            embedder,
            index,
            timeout: None,
        }
    }

    /// Bound each embedding batch by `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The index nodes are written to
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Extract the documents behind `locator` and index them
    pub async fn ingest(&self, locator: &str) -> Result<IngestReport> {
        let documents = self.extractor.extract(locator).await?;
        if documents.is_empty() {
            return Err(Error::extraction(locator, "no documents extracted"));
        }
        tracing::info!("Extracted {} documents from {}", documents.len(), locator);
        self.ingest_documents(documents).await
    }

    /// Chunk, embed and index already extracted documents.
    ///
    /// Nodes from all documents go into the index as a single batch, so a
    /// failure anywhere leaves the index untouched. A document already in
    /// the index is replaced as a whole.
    pub async fn ingest_documents(&self, documents: Vec<Document>) -> Result<IngestReport> {
        let nodes = self.chunker.split_all(&documents)?;
        let nodes = self.embed_nodes(nodes).await?;
        let count = nodes.len();

        self.index.replace_documents(nodes)?;

        let report = IngestReport {
            documents: documents.len(),
            nodes: count,
            dimensions: self.index.dimensions(),
        };
        tracing::info!(
            "Indexed {} nodes from {} documents ({} total)",
            report.nodes,
            report.documents,
            self.index.len()
        );
        Ok(report)
    }

    async fn embed_nodes(&self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        let mut embedded = Vec::with_capacity(nodes.len());

        for batch in nodes.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|n| n.text.clone()).collect();
            let vectors = bounded(self.timeout, "batch embedding", async {
                self.embedder
                    .embed_batch(&texts)
                    .await
                    .map_err(|e| e.into_upstream(self.embedder.name()))
            })
            .await?;

            if vectors.len() != batch.len() {
                return Err(Error::upstream(
                    self.embedder.name(),
                    format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        vectors.len()
                    ),
                ));
            }

            embedded.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(vectors)
                    .map(|(node, vector)| node.with_embedding(vector)),
            );
            tracing::debug!("Embedded {} of {} nodes", embedded.len(), nodes.len());
        }

        Ok(embedded)
    }
}

//! Retrieval-augmented query engine

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{CompletionProvider, EmbeddingProvider};
use crate::retrieval::VectorIndex;
use crate::types::QueryResult;

/// Per-engine query options
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Upper bound on the assembled context in characters
    pub max_context_chars: usize,
    /// Nodes below this similarity stay out of the context
    pub min_similarity_threshold: Option<f32>,
    /// Bound on each embedding/completion call
    pub timeout: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for QueryOptions {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            max_context_chars: config.max_context_chars,
            min_similarity_threshold: config.min_similarity_threshold,
            timeout: config.timeout(),
        }
    }
}

/// Answers questions against a shared vector index.
///
/// Stateless per call: embed the query, retrieve the top nodes, assemble a
/// bounded context and ask the completion service. Retries belong to the
/// provider clients; the engine calls each service once.
pub struct QueryEngine {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    completion: Arc<dyn CompletionProvider>,
    options: QueryOptions,
}

impl QueryEngine {
    /// Create a query engine
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
        options: QueryOptions,
    ) -> Self {
        Self {
            index,
            embedder,
            completion,
            options,
        }
    }

    /// The index this engine reads from
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Query options in effect
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Answer `query_text` using the `k` most similar nodes
    pub async fn answer(&self, query_text: &str, k: usize) -> Result<QueryResult> {
        if query_text.trim().is_empty() {
            return Err(Error::invalid_input("query text is empty"));
        }
        if self.index.is_empty() {
            return Err(Error::EmptyIndex);
        }

        let embedding = bounded(self.options.timeout, "query embedding", async {
            self.embedder
                .embed(query_text)
                .await
                .map_err(|e| e.into_upstream(self.embedder.name()))
        })
        .await?;

        let retrieved = self.index.query(&embedding, k)?;

        tracing::info!(
            "Retrieved {} nodes for query (top similarity {:.3})",
            retrieved.len(),
            retrieved.first().map_or(0.0, |r| r.similarity)
        );

        let context = PromptBuilder::build_context(
            &retrieved,
            self.options.max_context_chars,
            self.options.min_similarity_threshold,
        );

        if context.citations.is_empty() {
            tracing::warn!("No retrieved node passed the similarity threshold; answering without context");
        }

        let answer_text = bounded(self.options.timeout, "completion", async {
            self.completion
                .complete(query_text, &context.text)
                .await
                .map_err(|e| e.into_upstream(self.completion.name()))
        })
        .await?;

        Ok(QueryResult {
            query_text: query_text.to_string(),
            retrieved_node_ids: retrieved.iter().map(|r| r.node.id).collect(),
            citations: context.citations,
            answer_text,
        })
    }
}

/// Await `future`, failing with `Timeout` if it outlives `timeout`
pub(crate) async fn bounded<T>(
    timeout: Option<Duration>,
    operation: &str,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(after) => tokio::time::timeout(after, future)
            .await
            .map_err(|_| Error::timeout(operation, after))?,
        None => future.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Document, Node};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Maps known texts to fixed vectors; anything else embeds to [1, 0]
    struct TableEmbedder {
        table: Vec<(&'static str, Vec<f32>)>,
        delay: Option<Duration>,
        fail: bool,
    }

    impl TableEmbedder {
        fn new(table: Vec<(&'static str, Vec<f32>)>) -> Self {
            Self {
                table,
                delay: None,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(Error::invalid_input("model not loaded"));
            }
            Ok(self
                .table
                .iter()
                .find(|(t, _)| *t == text)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| vec![1.0, 0.0]))
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    /// Records the context it was given and echoes it back
    #[derive(Default)]
    struct RecordingLlm {
        contexts: Mutex<Vec<String>>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl CompletionProvider for RecordingLlm {
        async fn complete(&self, query: &str, context: &str) -> Result<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(Error::upstream("recording", "HTTP 503"));
            }
            self.contexts.lock().push(context.to_string());
            Ok(format!("{} => {}", query, context.replace("\n\n", " | ")))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    fn populated_index() -> (Arc<VectorIndex>, Vec<Node>) {
        let doc = Document::new("A. B. C.");
        let nodes = vec![
            Node::new(doc.id, 0, "A.").with_embedding(vec![1.0, 0.0]),
            Node::new(doc.id, 1, "B.").with_embedding(vec![0.0, 1.0]),
            Node::new(doc.id, 2, "C.").with_embedding(vec![0.9, 0.1]),
        ];
        let index = Arc::new(VectorIndex::new());
        index.insert(nodes.clone()).unwrap();
        (index, nodes)
    }

    fn engine(
        index: Arc<VectorIndex>,
        embedder: TableEmbedder,
        llm: Arc<RecordingLlm>,
        options: QueryOptions,
    ) -> QueryEngine {
        QueryEngine::new(index, Arc::new(embedder), llm, options)
    }

    #[tokio::test]
    async fn test_answer_uses_ranked_context() {
        let (index, nodes) = populated_index();
        let llm = Arc::new(RecordingLlm::default());
        let engine = engine(
            index,
            TableEmbedder::new(vec![("first?", vec![1.0, 0.0])]),
            Arc::clone(&llm),
            QueryOptions::default(),
        );

        let result = engine.answer("first?", 2).await.unwrap();

        assert_eq!(result.query_text, "first?");
        assert_eq!(result.retrieved_node_ids, vec![nodes[0].id, nodes[2].id]);
        assert_eq!(result.citations.len(), 2);
        assert_eq!(result.answer_text, "first? => A. | C.");
        assert_eq!(llm.contexts.lock().as_slice(), ["A.\n\nC."]);
    }

    #[tokio::test]
    async fn test_empty_index_is_surfaced() {
        let llm = Arc::new(RecordingLlm::default());
        let engine = engine(
            Arc::new(VectorIndex::new()),
            TableEmbedder::new(vec![]),
            Arc::clone(&llm),
            QueryOptions::default(),
        );

        let err = engine.answer("anything?", 3).await.unwrap_err();
        assert!(matches!(err, Error::EmptyIndex));
        assert!(llm.contexts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_blank_query() {
        let (index, _) = populated_index();
        let engine = engine(
            index,
            TableEmbedder::new(vec![]),
            Arc::new(RecordingLlm::default()),
            QueryOptions::default(),
        );
        assert!(matches!(
            engine.answer("   ", 1).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_low_similarity_still_calls_completion() {
        let (index, nodes) = populated_index();
        let llm = Arc::new(RecordingLlm::default());
        let options = QueryOptions {
            min_similarity_threshold: Some(0.999),
            ..QueryOptions::default()
        };
        let engine = engine(
            index,
            TableEmbedder::new(vec![("diagonal?", vec![1.0, 1.0])]),
            Arc::clone(&llm),
            options,
        );

        let result = engine.answer("diagonal?", 3).await.unwrap();

        assert_eq!(result.retrieved_node_ids.len(), 3);
        assert_eq!(result.retrieved_node_ids[0], nodes[2].id);
        assert!(!result.has_context());
        assert_eq!(llm.contexts.lock().as_slice(), [""]);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_upstream() {
        let (index, _) = populated_index();
        let mut embedder = TableEmbedder::new(vec![]);
        embedder.fail = true;
        let engine = engine(
            index,
            embedder,
            Arc::new(RecordingLlm::default()),
            QueryOptions::default(),
        );

        match engine.answer("first?", 1).await {
            Err(Error::Upstream { service, source }) => {
                assert_eq!(service, "table");
                assert!(source.to_string().contains("model not loaded"));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_completion_failure_passes_through() {
        let (index, _) = populated_index();
        let llm = Arc::new(RecordingLlm {
            fail: true,
            ..RecordingLlm::default()
        });
        let engine = engine(index, TableEmbedder::new(vec![]), llm, QueryOptions::default());

        match engine.answer("first?", 1).await {
            Err(Error::Upstream { service, .. }) => assert_eq!(service, "recording"),
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_embedding_times_out() {
        let (index, _) = populated_index();
        let mut embedder = TableEmbedder::new(vec![]);
        embedder.delay = Some(Duration::from_secs(5));
        let options = QueryOptions {
            timeout: Some(Duration::from_millis(20)),
            ..QueryOptions::default()
        };
        let engine = engine(index, embedder, Arc::new(RecordingLlm::default()), options);

        let err = engine.answer("first?", 1).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { ref operation, .. } if operation == "query embedding"));
    }

    #[tokio::test]
    async fn test_slow_completion_times_out() {
        let (index, _) = populated_index();
        let llm = Arc::new(RecordingLlm {
            delay: Some(Duration::from_secs(5)),
            ..RecordingLlm::default()
        });
        let options = QueryOptions {
            timeout: Some(Duration::from_millis(20)),
            ..QueryOptions::default()
        };
        let engine = engine(index, TableEmbedder::new(vec![]), Arc::clone(&llm), options);

        let err = engine.answer("first?", 1).await.unwrap_err();

        assert!(matches!(err, Error::Timeout { ref operation, .. } if operation == "completion"));
        assert!(llm.contexts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch_propagates() {
        let (index, _) = populated_index();
        let engine = engine(
            index,
            TableEmbedder::new(vec![("wide?", vec![1.0, 0.0, 0.0])]),
            Arc::new(RecordingLlm::default()),
            QueryOptions::default(),
        );

        let err = engine.answer("wide?", 1).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
    }
}

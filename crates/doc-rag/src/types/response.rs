//! Query result types

use serde::{Deserialize, Serialize};

use super::document::{DocumentId, Node, NodeId};

/// A node that contributed to the answer context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Node ID
    pub node_id: NodeId,
    /// Document the node belongs to
    pub document_id: DocumentId,
    /// Position of the node in its document
    pub sequence_index: usize,
    /// Cosine similarity to the query
    pub similarity: f32,
    /// Leading text of the node
    pub snippet: String,
}

impl Citation {
    /// Snippet length in characters
    pub const SNIPPET_CHARS: usize = 200;

    /// Create a citation from a retrieved node and its score
    pub fn from_node(node: &Node, similarity: f32) -> Self {
        Self {
            node_id: node.id,
            document_id: node.source_document_id,
            sequence_index: node.sequence_index,
            similarity,
            snippet: truncate_snippet(&node.text, Self::SNIPPET_CHARS),
        }
    }
}

/// Answer to a single query; not persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The question as asked
    pub query_text: String,
    /// Retrieved nodes, most relevant first
    pub retrieved_node_ids: Vec<NodeId>,
    /// Nodes that went into the context, in context order
    pub citations: Vec<Citation>,
    /// Synthesized answer
    pub answer_text: String,
}

impl QueryResult {
    /// Whether any retrieved node made it into the context
    pub fn has_context(&self) -> bool {
        !self.citations.is_empty()
    }
}

/// Cut text to at most `max_chars` characters, marking the cut with "..."
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

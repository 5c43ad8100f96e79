//! Document and node types with provenance tracking

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Document identifier
pub type DocumentId = Uuid;

/// Node identifier
pub type NodeId = Uuid;

/// String metadata attached to a document
pub type Metadata = HashMap<String, String>;

/// Raw text produced by a text extractor.
///
/// Immutable once created; consumed by the chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document ID
    pub id: DocumentId,
    /// Extracted text
    pub raw_text: String,
    /// Source metadata (locator, content type, ...)
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with a random ID
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), raw_text)
    }

    /// Create a document with a given ID
    pub fn with_id(id: DocumentId, raw_text: impl Into<String>) -> Self {
        Self {
            id,
            raw_text: raw_text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Create a document whose ID is derived from its source locator, so
    /// loading the same source twice yields the same ID.
    pub fn from_source(locator: &str, raw_text: impl Into<String>) -> Self {
        let mut doc = Self::with_id(Uuid::new_v5(&Uuid::NAMESPACE_URL, locator.as_bytes()), raw_text);
        doc.metadata.insert("source".to_string(), locator.to_string());
        doc
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Source locator, if recorded
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").map(String::as_str)
    }
}

/// A bounded-size chunk of one document; the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node ID
    pub id: NodeId,
    /// Chunk text
    pub text: String,
    /// Document this node was cut from
    pub source_document_id: DocumentId,
    /// Embedding vector, attached once after chunking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Position among the nodes of the same document (0-based)
    pub sequence_index: usize,
}

impl Node {
    /// Create a node without an embedding.
    ///
    /// The ID is derived from the document ID and position, so re-chunking
    /// a document reproduces the same node IDs.
    pub fn new(source_document_id: DocumentId, sequence_index: usize, text: impl Into<String>) -> Self {
        Self {
            id: Self::derive_id(&source_document_id, sequence_index),
            text: text.into(),
            source_document_id,
            embedding: None,
            sequence_index,
        }
    }

    /// Deterministic node ID for a document position
    pub fn derive_id(document_id: &DocumentId, sequence_index: usize) -> NodeId {
        Uuid::new_v5(document_id, &(sequence_index as u64).to_be_bytes())
    }

    /// Attach the embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Whether an embedding has been attached
    pub fn is_embedded(&self) -> bool {
        self.embedding.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_ids_are_stable() {
        let a = Document::from_source("http://paulgraham.com/worked.html", "text");
        let b = Document::from_source("http://paulgraham.com/worked.html", "other text");
        let c = Document::from_source("./data/10k/lyft_2021.pdf", "text");

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.source(), Some("http://paulgraham.com/worked.html"));
    }

    #[test]
    fn test_node_ids_follow_position() {
        let doc = Document::new("A. B.");
        let first = Node::new(doc.id, 0, "A.");
        let again = Node::new(doc.id, 0, "A.");
        let second = Node::new(doc.id, 1, "B.");

        assert_eq!(first.id, again.id);
        assert_ne!(first.id, second.id);
        assert!(!first.is_embedded());
        assert!(first.with_embedding(vec![1.0]).is_embedded());
    }
}

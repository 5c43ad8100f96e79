//! Vector index for node storage and cosine search

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::types::{DocumentId, Node, NodeId};

use super::similarity::cosine_similarity;

/// Search result with node and similarity
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNode {
    /// The retrieved node
    pub node: Node,
    /// Cosine similarity to the query (-1.0 to 1.0, higher is better)
    pub similarity: f32,
}

#[derive(Default)]
struct IndexInner {
    /// Dimensionality fixed by the first inserted embedding
    dimensions: Option<usize>,
    /// Stored nodes in insertion order; every node carries an embedding
    nodes: Vec<Node>,
    /// Node ID to position in `nodes`
    positions: HashMap<NodeId, usize>,
}

impl IndexInner {
    /// Check a batch against the index; returns the dimensionality it implies
    fn validate(&self, nodes: &[Node]) -> Result<Option<usize>> {
        let mut expected = self.dimensions;
        for node in nodes {
            let embedding = node.embedding.as_deref().ok_or_else(|| {
                Error::invalid_input(format!("node {} has no embedding", node.id))
            })?;
            if embedding.is_empty() {
                return Err(Error::invalid_input(format!(
                    "node {} has an empty embedding",
                    node.id
                )));
            }
            if embedding.iter().any(|x| !x.is_finite()) {
                return Err(Error::invalid_input(format!(
                    "node {} has a non-finite embedding value",
                    node.id
                )));
            }
            match expected {
                Some(dims) if dims != embedding.len() => {
                    return Err(Error::DimensionMismatch {
                        expected: dims,
                        actual: embedding.len(),
                    });
                }
                Some(_) => {}
                None => expected = Some(embedding.len()),
            }
        }
        Ok(expected)
    }

    /// Store validated nodes, overwriting entries with the same ID
    fn apply(&mut self, nodes: Vec<Node>) {
        let count = nodes.len();
        let mut replaced = 0usize;

        for node in nodes {
            match self.positions.get(&node.id).copied() {
                Some(pos) => {
                    self.nodes[pos] = node;
                    replaced += 1;
                }
                None => {
                    self.positions.insert(node.id, self.nodes.len());
                    self.nodes.push(node);
                }
            }
        }

        tracing::debug!(
            "Inserted {} nodes ({} replaced), index holds {}",
            count,
            replaced,
            self.nodes.len()
        );
    }

    fn rebuild_positions(&mut self) {
        self.positions = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
    }
}

/// In-memory vector index with cosine similarity search.
///
/// Single writer, many readers: inserts validate and apply a whole batch
/// under the write lock, so a concurrent query sees either none or all of
/// it. Re-inserting a node ID overwrites the stored entry in place.
#[derive(Default)]
pub struct VectorIndex {
    inner: RwLock<IndexInner>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert embedded nodes.
    ///
    /// The first embedding ever inserted fixes the index dimensionality.
    /// Nothing is stored if any node in the batch is rejected.
    pub fn insert(&self, nodes: Vec<Node>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write();
        let dimensions = inner.validate(&nodes)?;
        inner.dimensions = dimensions;
        inner.apply(nodes);
        Ok(())
    }

    /// Replace every document present in `nodes` with the given nodes.
    ///
    /// All previously stored nodes of those documents are dropped first, so
    /// a document that shrank since its last insert keeps no stale tail.
    /// Validation, removal and insertion happen under one write lock.
    pub fn replace_documents(&self, nodes: Vec<Node>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write();
        let dimensions = inner.validate(&nodes)?;

        let documents: HashSet<DocumentId> = nodes.iter().map(|n| n.source_document_id).collect();
        let before = inner.nodes.len();
        inner
            .nodes
            .retain(|n| !documents.contains(&n.source_document_id));
        let removed = before - inner.nodes.len();
        if removed > 0 {
            inner.rebuild_positions();
        }

        inner.dimensions = dimensions;
        tracing::debug!(
            "Dropped {} stored nodes of {} replaced documents",
            removed,
            documents.len()
        );
        inner.apply(nodes);
        Ok(())
    }

    /// Return up to `k` nodes most similar to `vector`, best first.
    ///
    /// Equal scores rank the earlier chunk (lower `sequence_index`) first,
    /// then the earlier insertion.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredNode>> {
        let inner = self.inner.read();

        if inner.nodes.is_empty() {
            return Err(Error::EmptyIndex);
        }

        let dims = inner.dimensions.unwrap_or(vector.len());
        if vector.len() != dims {
            return Err(Error::DimensionMismatch {
                expected: dims,
                actual: vector.len(),
            });
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = inner
            .nodes
            .iter()
            .enumerate()
            .map(|(pos, node)| {
                let embedding = node.embedding.as_deref().unwrap_or_default();
                (pos, cosine_similarity(vector, embedding))
            })
            .collect();

        // Stable sort keeps insertion order for full ties
        scored.sort_by(|(pa, sa), (pb, sb)| {
            sb.total_cmp(sa).then_with(|| {
                inner.nodes[*pa]
                    .sequence_index
                    .cmp(&inner.nodes[*pb].sequence_index)
            })
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, similarity)| ScoredNode {
                node: inner.nodes[pos].clone(),
                similarity,
            })
            .collect())
    }

    /// Get a stored node by ID
    pub fn get(&self, id: &NodeId) -> Option<Node> {
        let inner = self.inner.read();
        inner.positions.get(id).map(|&pos| inner.nodes[pos].clone())
    }

    /// Remove every node cut from `document_id`; returns how many were removed
    pub fn remove_document(&self, document_id: &DocumentId) -> usize {
        let mut inner = self.inner.write();
        let before = inner.nodes.len();
        inner.nodes.retain(|n| n.source_document_id != *document_id);
        let removed = before - inner.nodes.len();
        if removed > 0 {
            inner.rebuild_positions();
            tracing::debug!("Removed {} nodes of document {}", removed, document_id);
        }
        removed
    }

    /// Drop all nodes and forget the dimensionality
    pub fn clear(&self) {
        *self.inner.write() = IndexInner::default();
    }

    /// Number of stored nodes
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Whether no node is stored
    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }

    /// Dimensionality established by the first insert
    pub fn dimensions(&self) -> Option<usize> {
        self.inner.read().dimensions
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("VectorIndex")
            .field("dimensions", &inner.dimensions)
            .field("len", &inner.nodes.len())
            .finish()
    }
}

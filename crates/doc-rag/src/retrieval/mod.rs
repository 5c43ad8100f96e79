//! In-memory vector index and similarity search

pub mod index;
pub mod similarity;

pub use index::{ScoredNode, VectorIndex};
pub use similarity::cosine_similarity;

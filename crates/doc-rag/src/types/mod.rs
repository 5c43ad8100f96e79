//! Core types for the pipeline

pub mod document;
pub mod response;

pub use document::{Document, DocumentId, Metadata, Node, NodeId};
pub use response::{Citation, QueryResult};

//! Query answering over the vector index

mod engine;

pub(crate) use engine::bounded;
pub use engine::{QueryEngine, QueryOptions};

//! Document ingestion: extraction, sentence chunking and indexing

mod chunker;
pub mod extractor;
mod pipeline;

pub use chunker::SentenceChunker;
pub use extractor::{
    html_to_text, ContentType, FileExtractor, SourceExtractor, TextExtractor, WebPageExtractor,
};
pub use pipeline::{IngestPipeline, IngestReport, EMBED_BATCH_SIZE};

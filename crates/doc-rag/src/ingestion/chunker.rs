//! Sentence-aware text chunking with order tracking

use std::borrow::Cow;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::types::{Document, Node};

/// Greedy sentence packer.
///
/// Sentences are packed into a chunk until the next one would push the
/// chunk past `max_chunk_size` characters. A sentence longer than the limit
/// becomes its own chunk; text is never truncated.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    /// Maximum chunk size in characters
    max_chunk_size: usize,
}

impl SentenceChunker {
    /// Create a new chunker
    pub fn new(max_chunk_size: usize) -> Result<Self> {
        if max_chunk_size == 0 {
            return Err(Error::invalid_input("max_chunk_size must be greater than 0"));
        }
        Ok(Self { max_chunk_size })
    }

    /// Maximum chunk size in characters
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Split a document into ordered nodes
    pub fn split(&self, document: &Document) -> Result<Vec<Node>> {
        let text = join_wrapped_lines(&document.raw_text);
        let sentences = split_into_sentences(&text);
        if sentences.is_empty() {
            return Err(Error::invalid_input(format!(
                "document {} has no text",
                document.id
            )));
        }

        let mut nodes = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;

        for sentence in sentences {
            // Whitespace trailing the sentence only counts once another
            // sentence follows it in the same chunk.
            let trimmed_chars = sentence.trim_end().chars().count();

            if !current.is_empty() && current_chars + trimmed_chars > self.max_chunk_size {
                nodes.push(Node::new(document.id, nodes.len(), current.trim_end()));
                current.clear();
                current_chars = 0;
            }

            current.push_str(sentence);
            current_chars += sentence.chars().count();
        }

        if !current.trim().is_empty() {
            nodes.push(Node::new(document.id, nodes.len(), current.trim_end()));
        }

        tracing::debug!(
            "Split document {} into {} nodes (max {} chars)",
            document.id,
            nodes.len(),
            self.max_chunk_size
        );

        Ok(nodes)
    }

    /// Split several documents; each gets its own 0-based sequence
    pub fn split_all(&self, documents: &[Document]) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        for document in documents {
            nodes.extend(self.split(document)?);
        }
        Ok(nodes)
    }
}

/// Join lines that were hard-wrapped inside a paragraph.
///
/// Every line break counts as a sentence boundary in UAX #29, so wrapped
/// text would otherwise be cut mid-sentence. Blank lines separate
/// paragraphs and come out as a single `\n\n`.
fn join_wrapped_lines(text: &str) -> Cow<'_, str> {
    if !text.contains('\n') {
        return Cow::Borrowed(text);
    }

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    Cow::Owned(paragraphs.join("\n\n"))
}

/// Split text on Unicode sentence boundaries.
///
/// Leading whitespace of each sentence is dropped and whitespace-only
/// segments are skipped; trailing whitespace is kept so packed sentences
/// stay separated.
fn split_into_sentences(text: &str) -> Vec<&str> {
    text.split_sentence_bounds()
        .map(str::trim_start)
        .filter(|s| !s.is_empty())
        .collect()
}

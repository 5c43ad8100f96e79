//! Prompt templates and context assembly for answer synthesis

use crate::retrieval::ScoredNode;
use crate::types::Citation;

/// Separator placed between node texts in the context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Context handed to the completion service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextWindow {
    /// Concatenated node texts, most relevant first
    pub text: String,
    /// Nodes that contributed to `text`, in the same order
    pub citations: Vec<Citation>,
}

/// Prompt builder for retrieval-augmented queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Assemble the context from ranked retrieval results.
    ///
    /// Nodes below `min_similarity` are skipped. Texts are joined in rank
    /// order until `max_chars` is reached; the node that crosses the bound is
    /// cut at a character boundary and assembly stops there.
    pub fn build_context(
        results: &[ScoredNode],
        max_chars: usize,
        min_similarity: Option<f32>,
    ) -> ContextWindow {
        let mut window = ContextWindow::default();
        if max_chars == 0 {
            return window;
        }
        let mut used = 0usize;

        for result in results {
            if min_similarity.is_some_and(|min| result.similarity < min) {
                continue;
            }

            if !window.text.is_empty() {
                let sep = CONTEXT_SEPARATOR.chars().count();
                if used + sep >= max_chars {
                    break;
                }
                window.text.push_str(CONTEXT_SEPARATOR);
                used += sep;
            }

            let remaining = max_chars - used;
            let text = &result.node.text;
            window
                .citations
                .push(Citation::from_node(&result.node, result.similarity));

            match text.char_indices().nth(remaining) {
                Some((cut, _)) => {
                    window.text.push_str(&text[..cut]);
                    break;
                }
                None => {
                    window.text.push_str(text);
                    used += text.chars().count();
                    if used >= max_chars {
                        break;
                    }
                }
            }
        }

        window
    }

    /// Build the question-answering prompt.
    ///
    /// An empty context gets its own template so the model says the
    /// documents do not cover the question instead of guessing.
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        if context.trim().is_empty() {
            return format!(
                r#"No passages from the indexed documents were relevant to the question below.
Say that the documents do not contain the answer. Do not use outside knowledge.

Question: {question}

Answer:"#,
                question = question
            );
        }

        format!(
            r#"Context information is below.
---------------------
{context}
---------------------
Given the context information and not prior knowledge, answer the question.
If the context does not contain the answer, say so.

Question: {question}

Answer:"#,
            context = context,
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Document, Node};

    fn scored(texts: &[(&str, f32)]) -> Vec<ScoredNode> {
        let doc = Document::new("unused");
        texts
            .iter()
            .enumerate()
            .map(|(i, (text, similarity))| ScoredNode {
                node: Node::new(doc.id, i, *text),
                similarity: *similarity,
            })
            .collect()
    }

    #[test]
    fn test_context_keeps_rank_order() {
        let results = scored(&[("Second chunk.", 0.9), ("First chunk.", 0.8)]);
        let window = PromptBuilder::build_context(&results, 1000, None);

        assert_eq!(window.text, "Second chunk.\n\nFirst chunk.");
        assert_eq!(window.citations.len(), 2);
        assert_eq!(window.citations[0].sequence_index, 0);
    }

    #[test]
    fn test_context_is_bounded() {
        let results = scored(&[("abcdef", 0.9), ("ghijkl", 0.8), ("mnopqr", 0.7)]);
        let window = PromptBuilder::build_context(&results, 10, None);

        // 6 + 2 separator + 2 of the second node
        assert_eq!(window.text, "abcdef\n\ngh");
        assert_eq!(window.text.chars().count(), 10);
        assert_eq!(window.citations.len(), 2);
    }

    #[test]
    fn test_context_cuts_on_char_boundary() {
        let results = scored(&[("ééééé", 0.9)]);
        let window = PromptBuilder::build_context(&results, 3, None);
        assert_eq!(window.text, "ééé");
    }

    #[test]
    fn test_threshold_filters_context() {
        let results = scored(&[("relevant", 0.8), ("noise", 0.1)]);

        let window = PromptBuilder::build_context(&results, 1000, Some(0.5));
        assert_eq!(window.text, "relevant");
        assert_eq!(window.citations.len(), 1);

        let window = PromptBuilder::build_context(&results, 1000, Some(0.95));
        assert!(window.text.is_empty());
        assert!(window.citations.is_empty());
    }

    #[test]
    fn test_qa_prompt_variants() {
        let prompt = PromptBuilder::build_qa_prompt("What is this document about?", "Essays.");
        assert!(prompt.contains("Essays."));
        assert!(prompt.contains("Question: What is this document about?"));

        let empty = PromptBuilder::build_qa_prompt("What is this document about?", "");
        assert!(empty.contains("No passages"));
        assert!(empty.contains("What is this document about?"));
    }
}

//! Context assembly and prompt templates for answer synthesis

pub mod prompt;

pub use prompt::{ContextWindow, PromptBuilder, CONTEXT_SEPARATOR};

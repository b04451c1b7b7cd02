//! Splitting a selection into bounded, paragraph-aligned chunks.

pub mod chunker;

pub use chunker::{
    DEFAULT_MAX_CHUNK_LENGTH, PARAGRAPH_SEPARATOR, chunk_selection, normalize_paragraph_breaks,
    split_into_chunks,
};

/// A chunk of the selection, sent to the editing service on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of the chunk within the selection (0-based)
    pub index: usize,
    /// The text content
    pub text: String,
}

impl TextChunk {
    /// Create a new text chunk.
    pub fn new(index: usize, text: String) -> Self {
        Self { index, text }
    }
}

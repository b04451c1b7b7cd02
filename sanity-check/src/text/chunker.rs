//! Paragraph-aware chunking of a selection.

use once_cell::sync::Lazy;
use regex::Regex;

use super::TextChunk;

/// Default maximum chunk length in characters.
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 1000;

/// Separator placed between paragraphs inside a chunk and between chunks.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

const SEPARATOR_LEN: usize = PARAGRAPH_SEPARATOR.len();

/// One or more blank (whitespace-only) lines between two blocks.
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph break pattern should compile"));

/// Split text into paragraphs, dropping whitespace-only ones.
fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    PARAGRAPH_BREAK
        .split(text)
        .filter(|paragraph| !paragraph.trim().is_empty())
}

/// Rewrite every paragraph break to a single blank line.
///
/// This is the form `split_into_chunks` output joins back to.
pub fn normalize_paragraph_breaks(text: &str) -> String {
    paragraphs(text).collect::<Vec<_>>().join(PARAGRAPH_SEPARATOR)
}

/// Greedily pack paragraphs into chunks of at most `max_len` characters.
///
/// Paragraphs are never split: one longer than `max_len` becomes a chunk on
/// its own. Empty input gives no chunks, and no chunk is ever empty.
pub fn split_into_chunks(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in paragraphs(text) {
        let paragraph_len = paragraph.chars().count();

        if current.is_empty() {
            current.push_str(paragraph);
            current_len = paragraph_len;
        } else if current_len + SEPARATOR_LEN + paragraph_len <= max_len {
            current.push_str(PARAGRAPH_SEPARATOR);
            current.push_str(paragraph);
            current_len += SEPARATOR_LEN + paragraph_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(paragraph);
            current_len = paragraph_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Chunk a selection and tag each chunk with its position index.
pub fn chunk_selection(text: &str, max_len: usize) -> Vec<TextChunk> {
    split_into_chunks(text, max_len)
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk::new(index, text))
        .collect()
}

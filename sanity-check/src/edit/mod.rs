//! Editing chunks through the LLM service and stitching the results back together.

pub mod dispatcher;
pub mod processor;
pub mod prompt;
pub mod reassembler;

pub use dispatcher::{DispatchOptions, DispatchProgress, DispatchReport, FailurePolicy, dispatch};
pub use processor::{ChunkProcessor, ProcessedChunk};
pub use reassembler::reassemble;

/// The edited form of one chunk, in both renderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult {
    /// Position index of the chunk this result belongs to
    pub index: usize,
    /// Text with deletions marked `~~like this~~` and insertions `==like this==`
    pub annotated: String,
    /// Final text with every change applied
    pub clean: String,
}

/// All chunk results joined into one document, in both renderings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassembledDocument {
    pub annotated: String,
    pub clean: String,
}

impl ReassembledDocument {
    /// Whether the service proposed any change markup at all.
    pub fn has_markup(&self) -> bool {
        self.annotated.contains("~~") || self.annotated.contains("==")
    }
}

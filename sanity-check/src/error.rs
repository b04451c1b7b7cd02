//! Error types for the sanity-check pipeline.

use llm_client::LlmError;
use thiserror::Error;

/// Errors that abort a sanity check before or while applying it.
#[derive(Error, Debug)]
pub enum SanityError {
    /// Nothing (or only whitespace) is selected; no remote calls were made.
    #[error("No text selected")]
    EmptySelection,
    /// One or more chunks could not be edited; nothing was applied.
    #[error(transparent)]
    ChunkProcessing(#[from] ChunkProcessingError),
    /// The accepted edit could not be written to the editor.
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Every chunk that failed during one dispatch.
#[derive(Error, Debug)]
#[error("{} of {} chunk(s) failed: {}", .failures.len(), .total, describe(.failures))]
pub struct ChunkProcessingError {
    /// Number of chunks in the dispatch
    pub total: usize,
    /// Failures ordered by chunk index
    pub failures: Vec<ChunkFailure>,
}

impl ChunkProcessingError {
    /// Position indices of the chunks that failed.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

fn describe(failures: &[ChunkFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single chunk's failure, tagged with its position index.
#[derive(Error, Debug)]
#[error("chunk {index} ({attempts} attempt(s)): {reason}")]
pub struct ChunkFailure {
    pub index: usize,
    pub attempts: u32,
    #[source]
    pub reason: FailureReason,
}

#[derive(Error, Debug)]
pub enum FailureReason {
    #[error("editing service error: {0}")]
    Service(#[from] LlmError),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FailureReason {
    /// Only service errors the provider marks transient are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Service(e) => e.is_transient(),
            Self::MalformedResponse(_) => false,
        }
    }
}

/// Reasons the editor mutation could not be completed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("The selection changed since the check started; nothing was applied")]
    SelectionChanged,
    #[error("Selection {start}..{end} is outside the document or splits a character")]
    InvalidRange { start: usize, end: usize },
}

pub type Result<T> = std::result::Result<T, SanityError>;

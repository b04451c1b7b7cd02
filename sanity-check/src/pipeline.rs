//! The "run sanity check on selection" command.
//!
//! selection → chunks → concurrent edits → reassembled document → review → apply

use llm_client::{LlmProvider, TokenUsage};
use log::info;
use std::sync::Arc;

use crate::edit::{ChunkProcessor, DispatchOptions, DispatchProgress, dispatch, reassemble};
use crate::error::Result;
use crate::host::HostEditor;
use crate::review::{ReviewGate, ReviewOutcome, Reviewer, SelectionSnapshot};
use crate::text::{DEFAULT_MAX_CHUNK_LENGTH, chunk_selection};

/// Everything a single run needs besides the editor and the reviewer.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Maximum chunk length in characters
    pub max_chunk_length: usize,
    pub dispatch: DispatchOptions,
    pub temperature: Option<f32>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            max_chunk_length: DEFAULT_MAX_CHUNK_LENGTH,
            dispatch: DispatchOptions::default(),
            temperature: None,
        }
    }
}

/// A prepared document waiting for review, plus what it took to build it.
#[derive(Debug)]
pub struct PreparedCheck {
    pub gate: ReviewGate,
    pub chunk_count: usize,
    pub usage: TokenUsage,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub outcome: ReviewOutcome,
    pub chunk_count: usize,
    pub usage: TokenUsage,
}

/// The sanity check command, bound to a provider and fixed options.
pub struct SanityCheck {
    processor: ChunkProcessor,
    options: CheckOptions,
}

impl SanityCheck {
    pub fn new(provider: Arc<dyn LlmProvider>, options: CheckOptions) -> Self {
        let mut processor = ChunkProcessor::new(provider);
        if let Some(temperature) = options.temperature {
            processor = processor.with_temperature(temperature);
        }
        Self { processor, options }
    }

    /// Edit the current selection and open a review gate for it.
    ///
    /// Fails before any remote call when the selection is empty, and never
    /// touches the editor.
    pub async fn prepare<E, F>(&self, editor: &E, on_progress: F) -> Result<PreparedCheck>
    where
        E: HostEditor + ?Sized,
        F: FnMut(DispatchProgress),
    {
        let snapshot = SelectionSnapshot::capture(editor)?;
        let chunks = chunk_selection(&snapshot.text, self.options.max_chunk_length);
        info!(
            "Selection of {} chars split into {} chunk(s)",
            snapshot.text.chars().count(),
            chunks.len()
        );

        let report = dispatch(&self.processor, &chunks, &self.options.dispatch, on_progress).await?;
        let document = reassemble(&report.results);

        Ok(PreparedCheck {
            gate: ReviewGate::new(snapshot, document),
            chunk_count: chunks.len(),
            usage: report.usage,
        })
    }

    /// Run the whole command: prepare, review, and apply on acceptance.
    pub async fn run<E, R, F>(
        &self,
        editor: &mut E,
        reviewer: &mut R,
        on_progress: F,
    ) -> Result<CheckReport>
    where
        E: HostEditor + ?Sized,
        R: Reviewer + ?Sized,
        F: FnMut(DispatchProgress),
    {
        let prepared = self.prepare(&*editor, on_progress).await?;
        let decision = reviewer.review(prepared.gate.document());
        let outcome = prepared.gate.resolve(decision, editor)?;

        Ok(CheckReport {
            outcome,
            chunk_count: prepared.chunk_count,
            usage: prepared.usage,
        })
    }
}

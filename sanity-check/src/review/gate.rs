//! One-shot review of a reassembled document, then at most one editor mutation.

use log::{debug, info};
use std::ops::Range;

use super::ReviewDecision;
use crate::edit::ReassembledDocument;
use crate::error::{ApplyError, SanityError};
use crate::host::{HostEditor, Position};

/// The selection as it was when the check started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub text: String,
    pub range: Range<usize>,
    pub cursor: Position,
}

impl SelectionSnapshot {
    /// Capture the editor's selection; whitespace-only counts as empty.
    pub fn capture<E: HostEditor + ?Sized>(editor: &E) -> Result<Self, SanityError> {
        let text = editor
            .selection()
            .filter(|s| !s.trim().is_empty())
            .ok_or(SanityError::EmptySelection)?;

        Ok(Self {
            text,
            range: editor.selection_range(),
            cursor: editor.cursor(),
        })
    }
}

/// How a review ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// The clean text replaced the selection
    Applied,
    Rejected,
    /// Closed without a decision
    Dismissed,
}

/// Holds a reassembled document until the user decides on it.
///
/// `resolve` consumes the gate, so a document can be applied at most once.
#[derive(Debug)]
pub struct ReviewGate {
    snapshot: SelectionSnapshot,
    document: ReassembledDocument,
}

impl ReviewGate {
    pub fn new(snapshot: SelectionSnapshot, document: ReassembledDocument) -> Self {
        Self { snapshot, document }
    }

    /// The document under review.
    pub fn document(&self) -> &ReassembledDocument {
        &self.document
    }

    /// The selection the document will replace.
    pub fn snapshot(&self) -> &SelectionSnapshot {
        &self.snapshot
    }

    /// Apply the decision. Only `Accept` touches the editor.
    pub fn resolve<E: HostEditor + ?Sized>(
        self,
        decision: Option<ReviewDecision>,
        editor: &mut E,
    ) -> Result<ReviewOutcome, ApplyError> {
        match decision {
            Some(ReviewDecision::Accept) => {
                self.apply(editor)?;
                Ok(ReviewOutcome::Applied)
            }
            Some(ReviewDecision::Reject) => {
                info!("Changes rejected");
                Ok(ReviewOutcome::Rejected)
            }
            None => {
                info!("Review dismissed without a decision");
                Ok(ReviewOutcome::Dismissed)
            }
        }
    }

    fn apply<E: HostEditor + ?Sized>(self, editor: &mut E) -> Result<(), ApplyError> {
        let unchanged = editor.selection_range() == self.snapshot.range
            && editor.selection().as_deref() == Some(self.snapshot.text.as_str());
        if !unchanged {
            return Err(ApplyError::SelectionChanged);
        }

        editor.replace_selection(&self.document.clean)?;
        editor.set_cursor(self.snapshot.cursor);

        debug!(
            "Replaced {} bytes with {} bytes",
            self.snapshot.range.len(),
            self.document.clean.len()
        );
        info!("Changes applied");
        Ok(())
    }
}

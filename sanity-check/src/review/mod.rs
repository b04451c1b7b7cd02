//! Human review of proposed changes before they reach the document.

mod gate;
mod terminal;

pub use gate::{ReviewGate, ReviewOutcome, SelectionSnapshot};
pub use terminal::{AutoAccept, TerminalReviewer};

use crate::edit::ReassembledDocument;

/// The user's verdict on a whole reassembled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept,
    Reject,
}

/// Shows the annotated document to the user and collects a decision.
pub trait Reviewer {
    /// `None` means the review was dismissed without a decision.
    fn review(&mut self, document: &ReassembledDocument) -> Option<ReviewDecision>;
}

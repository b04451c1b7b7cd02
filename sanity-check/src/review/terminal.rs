//! Reviewers for the command line.

use log::warn;
use std::io::{self, BufRead, Write};

use super::{ReviewDecision, Reviewer};
use crate::edit::ReassembledDocument;

/// Prints the annotated text and asks for a yes/no answer.
pub struct TerminalReviewer<R, W> {
    input: R,
    output: W,
}

impl TerminalReviewer<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, read the answer from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalReviewer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, document: &ReassembledDocument) -> io::Result<Option<ReviewDecision>> {
        writeln!(self.output, "Review changes (~~deleted~~, ==added==):")?;
        writeln!(self.output, "---")?;
        writeln!(self.output, "{}", document.annotated)?;
        writeln!(self.output, "---")?;
        if !document.has_markup() {
            writeln!(self.output, "(no changes suggested)")?;
        }
        write!(self.output, "Accept changes? [y/N] ")?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Ok(None);
        }

        let decision = match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => ReviewDecision::Accept,
            _ => ReviewDecision::Reject,
        };
        Ok(Some(decision))
    }
}

impl<R: BufRead, W: Write> Reviewer for TerminalReviewer<R, W> {
    fn review(&mut self, document: &ReassembledDocument) -> Option<ReviewDecision> {
        match self.ask(document) {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Review prompt failed, treating as dismissed: {}", e);
                None
            }
        }
    }
}

/// Accepts every document without asking (`--yes`).
#[derive(Debug, Default)]
pub struct AutoAccept;

impl Reviewer for AutoAccept {
    fn review(&mut self, _document: &ReassembledDocument) -> Option<ReviewDecision> {
        Some(ReviewDecision::Accept)
    }
}

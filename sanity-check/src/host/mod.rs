//! The editor the sanity check runs inside.

mod buffer;

pub use buffer::TextBuffer;

use std::ops::Range;

use crate::error::ApplyError;

/// A cursor position: 0-based line and 0-based character column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// What the pipeline needs from a host editor.
pub trait HostEditor {
    /// The selected text, or `None` when nothing is selected.
    fn selection(&self) -> Option<String>;

    /// Byte range of the current selection.
    fn selection_range(&self) -> Range<usize>;

    /// Replace the selection with `text` as one undoable step.
    fn replace_selection(&mut self, text: &str) -> Result<(), ApplyError>;

    fn cursor(&self) -> Position;

    /// Move the cursor, clamping to the nearest valid position.
    fn set_cursor(&mut self, position: Position);
}

//! In-memory text buffer with a selection, a cursor and an undo stack.

use std::ops::Range;

use super::{HostEditor, Position};
use crate::error::ApplyError;

/// One reversible replacement.
#[derive(Debug, Clone)]
struct UndoStep {
    /// Where the inserted text now sits
    inserted: Range<usize>,
    /// Text that the insertion replaced
    removed: String,
    selection_before: Range<usize>,
    cursor_before: Position,
}

/// A plain-text document used as the host editor by the CLI and in tests.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    text: String,
    selection: Range<usize>,
    cursor: Position,
    undo_stack: Vec<UndoStep>,
}

impl TextBuffer {
    /// Create a buffer with an empty selection at the start.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Select a byte range.
    pub fn select(&mut self, range: Range<usize>) -> Result<(), ApplyError> {
        self.check_range(&range)?;
        self.selection = range;
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.selection = 0..self.text.len();
    }

    /// Select from the start of the first non-blank line to the last
    /// non-whitespace character, leaving surrounding blank lines out.
    pub fn select_content(&mut self) {
        let end = self.text.trim_end().len();
        let first = self.text.len() - self.text.trim_start().len();
        let start = self.text[..first].rfind('\n').map(|i| i + 1).unwrap_or(0);
        self.selection = start.min(end)..end;
    }

    /// Select whole lines `start..=end` (1-based), without the final line break.
    ///
    /// `end` is clamped to the last line.
    pub fn select_lines(&mut self, start: usize, end: usize) -> Result<(), ApplyError> {
        let starts = self.line_starts();
        if start == 0 || start > end || start > starts.len() {
            return Err(ApplyError::InvalidRange { start, end });
        }

        let end = end.min(starts.len());
        let from = starts[start - 1];
        let mut to = if end < starts.len() {
            starts[end] - 1
        } else {
            self.text.len()
        };
        if to > from && self.text.as_bytes()[to - 1] == b'\r' {
            to -= 1;
        }

        self.selection = from..to;
        Ok(())
    }

    /// Number of steps `undo` can revert.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Revert the most recent replacement. Returns false if there is none.
    pub fn undo(&mut self) -> bool {
        let Some(step) = self.undo_stack.pop() else {
            return false;
        };

        self.text.replace_range(step.inserted, &step.removed);
        self.selection = step.selection_before;
        self.cursor = step.cursor_before;
        true
    }

    /// Nearest valid position to `position`.
    pub fn clamp_position(&self, position: Position) -> Position {
        let lines: Vec<&str> = self.text.split('\n').collect();
        let line = position.line.min(lines.len() - 1);
        let width = lines[line].trim_end_matches('\r').chars().count();
        Position::new(line, position.column.min(width))
    }

    /// Position of a byte offset.
    fn position_of(&self, offset: usize) -> Position {
        let before = &self.text[..offset];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        Position::new(line, before[line_start..].chars().count())
    }

    fn line_starts(&self) -> Vec<usize> {
        std::iter::once(0)
            .chain(self.text.match_indices('\n').map(|(i, _)| i + 1))
            .collect()
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), ApplyError> {
        let valid = range.start <= range.end
            && range.end <= self.text.len()
            && self.text.is_char_boundary(range.start)
            && self.text.is_char_boundary(range.end);
        if valid {
            Ok(())
        } else {
            Err(ApplyError::InvalidRange {
                start: range.start,
                end: range.end,
            })
        }
    }
}

impl HostEditor for TextBuffer {
    fn selection(&self) -> Option<String> {
        if self.selection.is_empty() {
            return None;
        }
        self.text.get(self.selection.clone()).map(str::to_string)
    }

    fn selection_range(&self) -> Range<usize> {
        self.selection.clone()
    }

    fn replace_selection(&mut self, text: &str) -> Result<(), ApplyError> {
        let range = self.selection.clone();
        self.check_range(&range)?;

        let removed = self.text[range.clone()].to_string();
        self.text.replace_range(range.clone(), text);

        let inserted = range.start..range.start + text.len();
        self.undo_stack.push(UndoStep {
            inserted: inserted.clone(),
            removed,
            selection_before: range,
            cursor_before: self.cursor,
        });

        // Like most editors, leave the cursor after the inserted text
        self.cursor = self.position_of(inserted.end);
        self.selection = inserted;
        Ok(())
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, position: Position) {
        self.cursor = self.clamp_position(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_selection_by_default() {
        let buffer = TextBuffer::new("hello");
        assert_eq!(buffer.selection(), None);
    }

    #[test]
    fn test_select_lines() {
        let mut buffer = TextBuffer::new("one\ntwo\nthree\nfour");
        buffer.select_lines(2, 3).unwrap();
        assert_eq!(buffer.selection().as_deref(), Some("two\nthree"));

        buffer.select_lines(4, 99).unwrap();
        assert_eq!(buffer.selection().as_deref(), Some("four"));

        buffer.select_lines(1, 1).unwrap();
        assert_eq!(buffer.selection().as_deref(), Some("one"));
    }

    #[test]
    fn test_select_content_skips_surrounding_blank_lines() {
        let mut buffer = TextBuffer::new("\n \n  Title\n\nBody text.\n\n\n");
        buffer.select_content();
        assert_eq!(buffer.selection().as_deref(), Some("  Title\n\nBody text."));

        buffer.replace_selection("  Title\n\nBody text.").unwrap();
        assert_eq!(buffer.into_text(), "\n \n  Title\n\nBody text.\n\n\n");

        let mut blank = TextBuffer::new("\n   \n");
        blank.select_content();
        assert_eq!(blank.selection(), None);
    }

    #[test]
    fn test_select_lines_crlf() {
        let mut buffer = TextBuffer::new("one\r\ntwo\r\nthree");
        buffer.select_lines(1, 2).unwrap();
        assert_eq!(buffer.selection().as_deref(), Some("one\r\ntwo"));
    }

    #[test]
    fn test_select_lines_rejects_bad_ranges() {
        let mut buffer = TextBuffer::new("one\ntwo");
        assert!(buffer.select_lines(0, 1).is_err());
        assert!(buffer.select_lines(2, 1).is_err());
        assert!(buffer.select_lines(5, 6).is_err());
    }

    #[test]
    fn test_select_rejects_split_character() {
        let mut buffer = TextBuffer::new("héllo");
        assert!(buffer.select(0..2).is_err());
        assert!(buffer.select(0..3).is_ok());
        assert!(buffer.select(0..99).is_err());
    }

    #[test]
    fn test_replace_is_one_undo_step() {
        let original = "keep\nteh cat\n\nsat on teh mat\nkeep";
        let mut buffer = TextBuffer::new(original);
        buffer.select_lines(2, 4).unwrap();
        buffer.set_cursor(Position::new(1, 2));

        buffer.replace_selection("the cat\n\nsat on the mat").unwrap();
        assert_eq!(buffer.text(), "keep\nthe cat\n\nsat on the mat\nkeep");
        assert_eq!(buffer.undo_depth(), 1);
        assert_eq!(buffer.cursor(), Position::new(3, 14));

        assert!(buffer.undo());
        assert_eq!(buffer.text(), original);
        assert_eq!(buffer.cursor(), Position::new(1, 2));
        assert_eq!(buffer.selection().as_deref(), Some("teh cat\n\nsat on teh mat"));
        assert!(!buffer.undo());
    }

    #[test]
    fn test_clamp_position() {
        let buffer = TextBuffer::new("ab\ncdef\r\ng");
        assert_eq!(buffer.clamp_position(Position::new(0, 9)), Position::new(0, 2));
        assert_eq!(buffer.clamp_position(Position::new(1, 9)), Position::new(1, 4));
        assert_eq!(buffer.clamp_position(Position::new(9, 9)), Position::new(2, 1));
        assert_eq!(TextBuffer::new("").clamp_position(Position::new(3, 3)), Position::default());
    }

    #[test]
    fn test_position_counts_characters() {
        let mut buffer = TextBuffer::new("é\nü");
        buffer.select_all();
        buffer.replace_selection("ééé").unwrap();
        assert_eq!(buffer.cursor(), Position::new(0, 3));
    }
}

//! Cursor and selection management

use std::ops::Range;

/// Cursor state, in character offsets from the start of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Current cursor position
    pub position: usize,

    /// Selection mark
    /// If Some, there is an active selection from mark to position
    pub mark: Option<usize>,
}

/// Cursor movement commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Move left one character
    Left,
    /// Move right one character
    Right,
    /// Move to start of line
    LineStart,
    /// Move to end of line
    LineEnd,
    /// Move to start of document
    DocumentStart,
    /// Move to end of document
    DocumentEnd,
}

impl Cursor {
    pub fn at(position: usize) -> Self {
        Self {
            position,
            mark: None,
        }
    }

    /// Start selection at current position
    pub fn start_selection(&mut self) {
        self.mark = Some(self.position);
    }

    /// Clear selection
    pub fn clear_selection(&mut self) {
        self.mark = None;
    }

    /// Check if there is a non-empty selection
    pub fn has_selection(&self) -> bool {
        self.mark.is_some_and(|mark| mark != self.position)
    }

    /// Get selection range, ordered
    pub fn selection_range(&self) -> Option<Range<usize>> {
        let mark = self.mark?;
        if mark == self.position {
            return None;
        }
        Some(mark.min(self.position)..mark.max(self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_range_is_ordered() {
        let mut cursor = Cursor::at(9);
        cursor.mark = Some(4);
        assert_eq!(cursor.selection_range(), Some(4..9));

        cursor.position = 2;
        assert_eq!(cursor.selection_range(), Some(2..4));
    }

    #[test]
    fn test_collapsed_mark_is_not_a_selection() {
        let mut cursor = Cursor::at(3);
        cursor.start_selection();
        assert!(!cursor.has_selection());
        assert_eq!(cursor.selection_range(), None);
    }
}

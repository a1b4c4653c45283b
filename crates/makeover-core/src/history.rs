//! Linear undo/redo history of generated artifacts.

use crate::image::Artifact;

/// Ordered sequence of artifacts with a cursor pointing at the displayed one.
///
/// The cursor is `None` exactly when the sequence is empty; otherwise it
/// always indexes a valid element. Appending after an undo discards the
/// "future" branch for good: there is no history tree, only one truncating
/// line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySequence<T = Artifact> {
    entries: Vec<T>,
    cursor: Option<usize>,
}

impl<T> Default for HistorySequence<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
        }
    }
}

impl<T> HistorySequence<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the sequence and resets the cursor.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Branch-truncating append.
    ///
    /// Drops every entry after the cursor, pushes `entry` and moves the cursor
    /// onto it. Returns the number of entries discarded.
    pub fn append(&mut self, entry: T) -> usize {
        self.append_after(self.cursor, entry)
    }

    /// Branch-truncating append after an explicit position instead of the
    /// cursor. `None` empties the sequence first.
    ///
    /// Positions past the end are clamped to the last entry. Returns the
    /// number of entries discarded.
    pub fn append_after(&mut self, position: Option<usize>, entry: T) -> usize {
        let keep = position
            .map_or(0, |position| position + 1)
            .min(self.entries.len());
        let discarded = self.entries.len() - keep;
        self.entries.truncate(keep);
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);
        discarded
    }

    /// Moves the cursor one step back. No-op at the first entry or when empty.
    ///
    /// Returns whether the cursor moved.
    pub fn undo(&mut self) -> bool {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                true
            }
            _ => false,
        }
    }

    /// Moves the cursor one step forward. No-op at the last entry or when empty.
    ///
    /// Returns whether the cursor moved.
    pub fn redo(&mut self) -> bool {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.entries.len() => {
                self.cursor = Some(cursor + 1);
                true
            }
            _ => false,
        }
    }

    /// The entry under the cursor.
    pub fn current(&self) -> Option<&T> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.entries.len())
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }
}

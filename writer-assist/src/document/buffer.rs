//! In-memory document with a native undo/redo history.
//!
//! Stands in for the real editor in tests and scripted replays. It also
//! exposes the user's side of the document (`select`, `type_text`,
//! `set_ready`) so sessions can be driven with interleaved manual edits.

use shared_types::TextRange;

use super::DocumentModel;

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    removed: String,
    inserted: String,
    selection_before: TextRange,
    selection_after: TextRange,
}

#[derive(Debug, Clone)]
pub struct InMemoryDocument {
    chars: Vec<char>,
    selection: TextRange,
    undo_stack: Vec<Edit>,
    redo_stack: Vec<Edit>,
    ready: bool,
}

impl Default for InMemoryDocument {
    fn default() -> Self {
        Self::new("")
    }
}

impl InMemoryDocument {
    /// Document with the cursor at the start and an empty history.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            chars: text.into().chars().collect(),
            selection: TextRange::caret(0),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            ready: true,
        }
    }

    pub fn with_selection(mut self, start: usize, end: usize) -> Self {
        self.select(start, end);
        self
    }

    /// User places the cursor or drags a selection.
    pub fn select(&mut self, start: usize, end: usize) {
        self.set_selection(TextRange::new(start, end));
    }

    /// User types: overwrites the selection if there is one. One history entry.
    pub fn type_text(&mut self, text: &str) {
        let selection = self.selection;
        let after = TextRange::caret(selection.start + text.chars().count());
        self.splice(selection.start, selection.end, text, after);
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    fn clamp(&self, pos: usize) -> usize {
        pos.min(self.chars.len())
    }

    fn splice(&mut self, start: usize, end: usize, inserted: &str, selection_after: TextRange) {
        let start = self.clamp(start);
        let end = self.clamp(end).max(start);
        let removed: String = self
            .chars
            .splice(start..end, inserted.chars())
            .collect();

        self.undo_stack.push(Edit {
            start,
            removed,
            inserted: inserted.to_string(),
            selection_before: self.selection,
            selection_after,
        });
        self.redo_stack.clear();
        self.selection = selection_after;
    }
}

impl DocumentModel for InMemoryDocument {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn text(&self) -> String {
        self.chars.iter().collect()
    }

    fn selection(&self) -> TextRange {
        self.selection
    }

    fn set_selection(&mut self, range: TextRange) {
        self.selection = TextRange::new(self.clamp(range.start), self.clamp(range.end));
    }

    fn replace_selection(&mut self, text: &str) {
        let selection = self.selection;
        let after = TextRange::caret(selection.start + text.chars().count());
        self.splice(selection.start, selection.end, text, after);
    }

    fn insert_at_cursor(&mut self, text: &str) {
        let cursor = self.selection.end;
        let after = TextRange::caret(cursor + text.chars().count());
        self.splice(cursor, cursor, text, after);
    }

    fn move_to_end(&mut self) -> usize {
        let end = self.chars.len();
        self.selection = TextRange::caret(end);
        end
    }

    fn insert_at_position(&mut self, pos: usize, text: &str) {
        let pos = self.clamp(pos);
        let inserted = text.chars().count();
        let shift = |offset: usize| if offset > pos { offset + inserted } else { offset };
        let after = TextRange::new(shift(self.selection.start), shift(self.selection.end));
        self.splice(pos, pos, text, after);
    }

    fn undo_last_operation(&mut self) -> bool {
        let Some(edit) = self.undo_stack.pop() else {
            return false;
        };
        let end = edit.start + edit.inserted.chars().count();
        let _ = self.chars.splice(edit.start..end, edit.removed.chars());
        self.selection = edit.selection_before;
        self.redo_stack.push(edit);
        true
    }

    fn redo_last_operation(&mut self) -> bool {
        let Some(edit) = self.redo_stack.pop() else {
            return false;
        };
        let end = edit.start + edit.removed.chars().count();
        let _ = self.chars.splice(edit.start..end, edit.inserted.chars());
        self.selection = edit.selection_after;
        self.undo_stack.push(edit);
        true
    }
}

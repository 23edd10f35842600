//! Document model adapter boundary.
//!
//! The editable document is owned by an external editor. The engine only
//! reaches it through [`DocumentModel`], and never assumes it is the sole
//! writer: the user may keep typing between apply and resolve.

mod buffer;

pub use buffer::InMemoryDocument;

use sha2::{Digest, Sha256};
use shared_types::TextRange;

/// Selection/cursor/undo primitives of an editable document.
///
/// Positions are char offsets. Every mutating call (`replace_selection`,
/// `insert_at_cursor`, `insert_at_position`) must record exactly one entry on
/// the document's own undo history; selection moves record none.
pub trait DocumentModel: Send {
    /// False while the editor is still mounting or has been torn down.
    fn is_ready(&self) -> bool {
        true
    }

    /// Full document text.
    fn text(&self) -> String;

    /// Current selection; collapsed when only a cursor is placed.
    fn selection(&self) -> TextRange;

    fn has_selection(&self) -> bool {
        !self.selection().is_empty()
    }

    fn selected_text(&self) -> String {
        char_slice(&self.text(), self.selection())
    }

    /// Move the cursor/selection without touching content.
    fn set_selection(&mut self, range: TextRange);

    fn replace_selection(&mut self, text: &str);

    fn insert_at_cursor(&mut self, text: &str);

    /// Collapse the selection at the end of the document and return that offset.
    fn move_to_end(&mut self) -> usize;

    fn insert_at_position(&mut self, pos: usize, text: &str);

    /// Returns false when the undo history is empty.
    fn undo_last_operation(&mut self) -> bool;

    /// Returns false when there is nothing to redo.
    fn redo_last_operation(&mut self) -> bool;
}

impl<T: DocumentModel + ?Sized> DocumentModel for Box<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn text(&self) -> String {
        (**self).text()
    }

    fn selection(&self) -> TextRange {
        (**self).selection()
    }

    fn has_selection(&self) -> bool {
        (**self).has_selection()
    }

    fn selected_text(&self) -> String {
        (**self).selected_text()
    }

    fn set_selection(&mut self, range: TextRange) {
        (**self).set_selection(range)
    }

    fn replace_selection(&mut self, text: &str) {
        (**self).replace_selection(text)
    }

    fn insert_at_cursor(&mut self, text: &str) {
        (**self).insert_at_cursor(text)
    }

    fn move_to_end(&mut self) -> usize {
        (**self).move_to_end()
    }

    fn insert_at_position(&mut self, pos: usize, text: &str) {
        (**self).insert_at_position(pos, text)
    }

    fn undo_last_operation(&mut self) -> bool {
        (**self).undo_last_operation()
    }

    fn redo_last_operation(&mut self) -> bool {
        (**self).redo_last_operation()
    }
}

/// SHA-256 hex digest of document text.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

pub(crate) fn char_slice(text: &str, range: TextRange) -> String {
    text.chars()
        .skip(range.start)
        .take(range.end.saturating_sub(range.start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint("hello");
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint("hello"));
        assert_ne!(a, fingerprint("hello "));
    }

    #[test]
    fn char_slice_uses_char_offsets() {
        assert_eq!(char_slice("héllo wörld", TextRange::new(6, 11)), "wörld");
        assert_eq!(char_slice("abc", TextRange::new(2, 10)), "c");
        assert_eq!(char_slice("abc", TextRange::caret(1)), "");
    }
}

//! Whole-word rename, prepare-rename, and references.
//!
//! All three share the same occurrence scan: a match counts only when its
//! neighbors are not identifier characters, so substrings never rename.

use liger_core::{Location, Position, Range};
use rustc_hash::FxHashMap;

use crate::documents::Document;
use crate::utils::{whole_word_occurrences, word_range_at_position};

/// A single text replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

/// Edits grouped by document URI.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceEdit {
    pub changes: FxHashMap<String, Vec<TextEdit>>,
}

/// The range of the symbol under the cursor, for the client's rename UI.
/// Null when the cursor is not on a word.
pub fn prepare_rename(doc: &Document, position: Position) -> Option<Range> {
    word_range_at_position(doc, position).map(|(_, range)| range)
}

/// Rename every whole-word occurrence of the symbol under the cursor
/// within the document. Returns `None` when there is nothing to edit.
pub fn rename(doc: &Document, position: Position, new_name: &str) -> Option<WorkspaceEdit> {
    let (old_name, _) = word_range_at_position(doc, position)?;

    let edits: Vec<TextEdit> = occurrences(doc, &old_name)
        .into_iter()
        .map(|range| TextEdit {
            range,
            new_text: new_name.to_string(),
        })
        .collect();

    if edits.is_empty() {
        return None;
    }

    let mut changes = FxHashMap::default();
    changes.insert(doc.uri.clone(), edits);
    Some(WorkspaceEdit { changes })
}

/// Whole-word occurrences of the symbol under the cursor, as locations in
/// the source document.
pub fn find_references(doc: &Document, position: Position) -> Vec<Location> {
    let word = match word_range_at_position(doc, position) {
        Some((word, _)) => word,
        None => return Vec::new(),
    };
    occurrences(doc, &word)
        .into_iter()
        .map(|range| Location::new(doc.uri.clone(), range))
        .collect()
}

fn occurrences(doc: &Document, word: &str) -> Vec<Range> {
    let mut found = Vec::new();
    for (line_no, line) in doc.lines().iter().enumerate() {
        for (start, end) in whole_word_occurrences(line, word) {
            found.push(Range::on_line(line_no as u32, start, end));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("file:///t.cr", "crystal", 1, text)
    }

    #[test]
    fn test_rename_all_whole_word_occurrences() {
        let d = doc("foo = 1\nbar = foo + foo");
        let edit = rename(&d, Position::new(1, 6), "qux").unwrap();

        let edits = &edit.changes["file:///t.cr"];
        assert_eq!(edits.len(), 3);
        assert_eq!(edits[0].range, Range::on_line(0, 0, 3));
        assert_eq!(edits[1].range, Range::on_line(1, 6, 9));
        assert_eq!(edits[2].range, Range::on_line(1, 12, 15));
        assert!(edits.iter().all(|e| e.new_text == "qux"));
    }

    #[test]
    fn test_rename_skips_substrings() {
        let d = doc("foo foobar barfoo\nfoo");
        let edit = rename(&d, Position::new(0, 1), "x").unwrap();
        let edits = &edit.changes["file:///t.cr"];
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].range, Range::on_line(0, 0, 3));
        assert_eq!(edits[1].range, Range::on_line(1, 0, 3));
    }

    #[test]
    fn test_rename_on_whitespace_is_none() {
        let d = doc("a  b");
        assert!(rename(&d, Position::new(0, 1), "x").is_none());
    }

    #[test]
    fn test_rename_edits_confined_to_document() {
        let d = doc("val = 1\nval");
        let edit = rename(&d, Position::new(0, 1), "renamed").unwrap();
        assert_eq!(edit.changes.len(), 1);
        assert!(edit.changes.contains_key("file:///t.cr"));
    }

    #[test]
    fn test_prepare_rename_range() {
        let d = doc("hello world");
        assert_eq!(
            prepare_rename(&d, Position::new(0, 8)),
            Some(Range::on_line(0, 6, 11))
        );
        assert!(prepare_rename(&d, Position::new(0, 5)).is_none());
    }

    #[test]
    fn test_references_match_rename_occurrences() {
        let d = doc("x = 1\ny = x + x");
        let refs = find_references(&d, Position::new(0, 0));
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|r| r.uri == "file:///t.cr"));
    }

    #[test]
    fn test_rename_ivar() {
        let d = doc("@count : Int32\n@count += 1");
        let edit = rename(&d, Position::new(0, 3), "@total").unwrap();
        let edits = &edit.changes["file:///t.cr"];
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].range, Range::on_line(0, 0, 6));
    }
}

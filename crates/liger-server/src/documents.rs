//! In-memory mirror of open documents with incremental edit support.
//!
//! Each open document keeps its full text plus a line index (the split of
//! the text on `\n`); the index is recomputed after every mutation so the
//! two never diverge.

use liger_core::{Position, Range};
use rustc_hash::FxHashMap;

/// A single text change from a `didChange` notification. `range` absent
/// means a full-document replace.
#[derive(Debug, Clone)]
pub struct ContentChange {
    pub range: Option<Range>,
    pub text: String,
}

/// An open text document.
#[derive(Debug, Clone)]
pub struct Document {
    pub uri: String,
    pub language_id: String,
    pub version: i32,
    text: String,
    lines: Vec<String>,
}

impl Document {
    pub fn new(uri: impl Into<String>, language_id: impl Into<String>, version: i32, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = split_lines(&text);
        Self {
            uri: uri.into(),
            language_id: language_id.into(),
            version,
            text,
            lines,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: u32) -> Option<&str> {
        self.lines.get(index as usize).map(|s| s.as_str())
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Convert a position to a character offset. Newlines count as one
    /// unit; positions past the end of a line clamp to the line end, and
    /// positions past the last line clamp to the end of the text.
    pub fn offset_at(&self, position: Position) -> usize {
        let mut offset = 0usize;
        for (index, line) in self.lines.iter().enumerate() {
            let line_len = line.chars().count();
            if index as u32 == position.line {
                return offset + line_len.min(position.character as usize);
            }
            offset += line_len + 1;
        }
        offset.saturating_sub(1)
    }

    /// Convert a character offset back to a position.
    pub fn position_at(&self, offset: usize) -> Position {
        let mut remaining = offset;
        for (index, line) in self.lines.iter().enumerate() {
            let line_len = line.chars().count();
            if remaining <= line_len {
                return Position::new(index as u32, remaining as u32);
            }
            remaining -= line_len + 1;
        }
        let last = self.lines.len().saturating_sub(1);
        let len = self.lines.last().map(|l| l.chars().count()).unwrap_or(0);
        Position::new(last as u32, len as u32)
    }

    /// Apply one content change. Ranged changes splice the new text between
    /// a prefix and suffix computed on the line index; rangeless changes
    /// replace the whole document.
    pub fn apply_change(&mut self, change: &ContentChange) {
        match change.range {
            None => {
                self.text = change.text.clone();
            }
            Some(range) => {
                let start_line = range.start.line as usize;
                let start_char = range.start.character as usize;
                let end_line = range.end.line as usize;
                let end_char = range.end.character as usize;

                let mut prefix = String::new();
                if start_line > 0 {
                    let upto = self.lines.len().min(start_line);
                    prefix.push_str(&self.lines[..upto].join("\n"));
                    prefix.push('\n');
                }
                if let Some(line) = self.lines.get(start_line) {
                    prefix.push_str(&take_chars(line, start_char));
                }

                let mut suffix = String::new();
                if let Some(line) = self.lines.get(end_line) {
                    suffix.push_str(&skip_chars(line, end_char));
                }
                if end_line + 1 < self.lines.len() {
                    suffix.push('\n');
                    suffix.push_str(&self.lines[end_line + 1..].join("\n"));
                }

                self.text = format!("{}{}{}", prefix, change.text, suffix);
            }
        }
        self.lines = split_lines(&self.text);
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(|s| s.to_string()).collect()
}

fn take_chars(line: &str, count: usize) -> String {
    line.chars().take(count).collect()
}

fn skip_chars(line: &str, count: usize) -> String {
    line.chars().skip(count).collect()
}

/// The process-wide store of open documents.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: FxHashMap<String, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document from `didOpen`.
    pub fn open(&mut self, uri: &str, language_id: &str, version: i32, text: &str) {
        self.documents
            .insert(uri.to_string(), Document::new(uri, language_id, version, text));
    }

    /// Apply a `didChange` batch in order. Unknown URIs are a no-op.
    pub fn change(&mut self, uri: &str, version: i32, changes: &[ContentChange]) {
        if let Some(doc) = self.documents.get_mut(uri) {
            for change in changes {
                doc.apply_change(change);
            }
            doc.version = version;
        }
    }

    /// Drop a document on `didClose`. Unknown URIs are a no-op.
    pub fn close(&mut self, uri: &str) {
        self.documents.remove(uri);
    }

    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn all(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

//! Core types shared across all Liger crates.
//!
//! This crate provides the fundamental vocabulary of the language server:
//! document positions and ranges, symbol descriptions produced by the
//! workspace index, diagnostics, and the error types every other crate
//! builds on.

mod error;
mod symbol;

pub use error::*;
pub use symbol::*;

use serde::{Deserialize, Serialize};

/// A position in a document, using 0-based line and character offsets.
///
/// Characters count UTF-16 code units, as mandated by the protocol.
/// Positions are totally ordered: first by line, then by character.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// Line number (0-based)
    pub line: u32,
    /// Character offset within the line (0-based)
    pub character: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// A range in a document, defined by start and end positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (inclusive for containment checks)
    pub end: Position,
}

impl Range {
    /// Create a new range.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a range that covers a single line segment.
    pub fn on_line(line: u32, start_char: u32, end_char: u32) -> Self {
        Self {
            start: Position::new(line, start_char),
            end: Position::new(line, end_char),
        }
    }

    /// Create an empty range at a single position.
    pub fn at(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Check whether the range contains a position, with `start <= p <= end`
    /// under lexicographic ordering.
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    /// Check whether this range is empty (start == end).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A location: a document URI plus a range within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// The document URI
    pub uri: String,
    /// The range within the document
    pub range: Range,
}

impl Location {
    /// Create a location covering a range in the given document.
    pub fn new(uri: impl Into<String>, range: Range) -> Self {
        Self {
            uri: uri.into(),
            range,
        }
    }

    /// Create a location at the very start of a document.
    pub fn file_start(uri: impl Into<String>) -> Self {
        Self::new(uri, Range::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        let a = Position::new(1, 5);
        let b = Position::new(1, 9);
        let c = Position::new(2, 0);

        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
        assert_eq!(a, Position::new(1, 5));
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = Range::on_line(3, 4, 10);

        assert!(range.contains(Position::new(3, 4)));
        assert!(range.contains(Position::new(3, 7)));
        assert!(range.contains(Position::new(3, 10)));
        assert!(!range.contains(Position::new(3, 3)));
        assert!(!range.contains(Position::new(3, 11)));
        assert!(!range.contains(Position::new(2, 7)));
        assert!(!range.contains(Position::new(4, 0)));
    }

    #[test]
    fn test_range_contains_across_lines() {
        let range = Range::new(Position::new(1, 8), Position::new(4, 2));

        assert!(range.contains(Position::new(2, 0)));
        assert!(range.contains(Position::new(3, 200)));
        assert!(range.contains(Position::new(4, 2)));
        assert!(!range.contains(Position::new(4, 3)));
        assert!(!range.contains(Position::new(1, 7)));
    }

    #[test]
    fn test_empty_range_contains_only_itself() {
        let range = Range::at(Position::new(5, 5));
        assert!(range.contains(Position::new(5, 5)));
        assert!(!range.contains(Position::new(5, 6)));
    }
}

//! Helpers for word extraction and document text inspection.
//!
//! Crystal identifiers may end in `?` or `!` and instance variables carry
//! a leading `@`; the word helpers here honor both.

use liger_core::{Position, Range};

use crate::documents::Document;

/// Whether a character can appear inside a Crystal identifier.
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '?' || ch == '!'
}

/// The word under the cursor, if any, with its character range on the
/// line. A leading `@` (or `@@`) is included; trailing `?`/`!` are part of
/// the identifier.
pub fn word_at(line: &str, character: u32) -> Option<(String, u32, u32)> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return None;
    }

    let mut index = character as usize;
    // A cursor sitting on the `@` sigil counts as being on the variable
    while index < chars.len() && chars[index] == '@' {
        index += 1;
    }
    if index >= chars.len() || !is_word_char(chars[index]) {
        return None;
    }

    let mut start = index;
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = index;
    while end + 1 < chars.len() && is_word_char(chars[end + 1]) {
        end += 1;
    }

    // Pull in the instance-variable sigil
    while start > 0 && chars[start - 1] == '@' {
        start -= 1;
    }

    let word: String = chars[start..=end].iter().collect();
    if word.chars().all(|c| c == '@') {
        return None;
    }
    Some((word, start as u32, end as u32 + 1))
}

/// The word under the cursor in a document.
pub fn word_at_position(doc: &Document, position: Position) -> Option<String> {
    let line = doc.line(position.line)?;
    word_at(line, position.character).map(|(word, _, _)| word)
}

/// The word under the cursor and the range it covers.
pub fn word_range_at_position(doc: &Document, position: Position) -> Option<(String, Range)> {
    let line = doc.line(position.line)?;
    word_at(line, position.character)
        .map(|(word, start, end)| (word, Range::on_line(position.line, start, end)))
}

/// Collect the contiguous run of `#` comment lines immediately above
/// `line`, skipping blank lines between the block and the declaration.
pub fn doc_comment_above(lines: &[String], line: usize) -> Option<String> {
    let mut collected: Vec<String> = Vec::new();
    let mut index = line;
    let mut seen_comment = false;

    while index > 0 {
        index -= 1;
        let trimmed = lines[index].trim();
        if trimmed.starts_with('#') {
            let content = trimmed.trim_start_matches('#').trim_start();
            collected.push(content.to_string());
            seen_comment = true;
        } else if trimmed.is_empty() && !seen_comment {
            // Blank lines between the declaration and its comment block
            continue;
        } else {
            break;
        }
    }

    if collected.is_empty() {
        return None;
    }
    collected.reverse();
    Some(collected.join("\n"))
}

/// Indentation width of a line in columns, counting a tab as one.
pub fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Convert a byte offset in `text` to a line/character position.
pub fn byte_offset_to_position(text: &str, offset: usize) -> Position {
    let clamped = offset.min(text.len());
    let before = &text[..clamped];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let character = text[line_start..clamped].chars().count() as u32;
    Position::new(line, character)
}

/// Convert a byte-offset span from the syntax crate to a position range.
pub fn span_to_range(text: &str, span: &liger_syntax::Span) -> Range {
    Range::new(
        byte_offset_to_position(text, span.start),
        byte_offset_to_position(text, span.end),
    )
}

/// Whole-word occurrences of `word` on a line, as (start, end) character
/// ranges. A match counts only when its neighbors are not word characters
/// or `@`.
pub fn whole_word_occurrences(line: &str, word: &str) -> Vec<(u32, u32)> {
    let chars: Vec<char> = line.chars().collect();
    let needle: Vec<char> = word.chars().collect();
    if needle.is_empty() || chars.len() < needle.len() {
        return Vec::new();
    }

    let boundary = |c: char| !is_word_char(c) && c != '@';
    let mut found = Vec::new();
    let mut index = 0usize;
    while index + needle.len() <= chars.len() {
        if chars[index..index + needle.len()] == needle[..] {
            let left_ok = index == 0 || boundary(chars[index - 1]);
            let right = index + needle.len();
            let right_ok = right >= chars.len() || boundary(chars[right]);
            if left_ok && right_ok {
                found.push((index as u32, right as u32));
                index += needle.len();
                continue;
            }
        }
        index += 1;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_extraction_with_crystal_lexicals() {
        let line = "empty? nil! @var";
        assert_eq!(word_at(line, 2).map(|w| w.0), Some("empty?".into()));
        assert_eq!(word_at(line, 8).map(|w| w.0), Some("nil!".into()));
        assert_eq!(word_at(line, 12).map(|w| w.0), Some("@var".into()));
    }

    #[test]
    fn test_word_on_whitespace_is_none() {
        assert!(word_at("foo bar", 3).is_none());
        assert!(word_at("", 0).is_none());
        assert!(word_at("   ", 1).is_none());
    }

    #[test]
    fn test_cursor_just_past_word_is_none() {
        // The expansion run is empty when the cursor is not on a word char
        assert!(word_at("foo", 3).is_none());
        assert!(word_at("foo bar", 3).is_none());
    }

    #[test]
    fn test_cursor_past_end_of_line() {
        assert!(word_at("foo ", 40).is_none());
    }

    #[test]
    fn test_word_range() {
        let (word, start, end) = word_at("x = @count + 1", 5).unwrap();
        assert_eq!(word, "@count");
        assert_eq!(start, 4);
        assert_eq!(end, 10);
    }

    #[test]
    fn test_class_var_sigil() {
        assert_eq!(word_at("@@total", 4).map(|w| w.0), Some("@@total".into()));
    }

    #[test]
    fn test_doc_comment_above() {
        let lines: Vec<String> = vec![
            "# Parses a thing.".into(),
            "# Returns nil on failure.".into(),
            "def parse".into(),
        ];
        let doc = doc_comment_above(&lines, 2).unwrap();
        assert_eq!(doc, "Parses a thing.\nReturns nil on failure.");
    }

    #[test]
    fn test_doc_comment_skips_blank_gap() {
        let lines: Vec<String> = vec![
            "# Above a gap.".into(),
            "".into(),
            "def gap".into(),
        ];
        let doc = doc_comment_above(&lines, 2).unwrap();
        assert_eq!(doc, "Above a gap.");
    }

    #[test]
    fn test_doc_comment_stops_at_code() {
        let lines: Vec<String> = vec![
            "x = 1".into(),
            "# Only this.".into(),
            "def one".into(),
        ];
        assert_eq!(doc_comment_above(&lines, 2).unwrap(), "Only this.");
        assert!(doc_comment_above(&lines, 0).is_none());
    }

    #[test]
    fn test_whole_word_occurrences() {
        let hits = whole_word_occurrences("bar = foo + foo", "foo");
        assert_eq!(hits, vec![(6, 9), (12, 15)]);

        // Substrings do not count
        let hits = whole_word_occurrences("foobar foo barfoo", "foo");
        assert_eq!(hits, vec![(7, 10)]);

        // `@foo` is not a whole-word `foo`
        let hits = whole_word_occurrences("@foo foo", "foo");
        assert_eq!(hits, vec![(5, 8)]);
    }

    #[test]
    fn test_indent_of() {
        assert_eq!(indent_of("    four"), 4);
        assert_eq!(indent_of("\tone"), 1);
        assert_eq!(indent_of("none"), 0);
    }
}

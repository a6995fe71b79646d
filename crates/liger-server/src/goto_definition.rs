//! Go-to-definition, resolved through layered fallback.
//!
//! Require paths and `fun` names resolve structurally; identifiers are
//! looked up in the current file first, then the workspace index, then
//! accessor/ivar tables, then by receiver type, and finally through the
//! compiler oracle.

use std::path::Path;
use std::sync::LazyLock;

use liger_core::{Location, Position, Range, SymbolInfo};
use regex::Regex;

use crate::documents::Document;
use crate::paths;
use crate::requires;
use crate::utils::{word_at, word_range_at_position};
use crate::workspace::{type_of_variable, WorkspaceIndex};

static FUN_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*fun\s+(\w+)").expect("fun-name pattern"));

/// Find the definition of the symbol at `position`.
pub fn find_definition(
    doc: &Document,
    position: Position,
    root: &Path,
    index: &mut WorkspaceIndex,
    discover_stdlib: impl FnOnce() -> Vec<std::path::PathBuf>,
    oracle_fallback: impl FnOnce() -> Option<Location>,
) -> Option<Location> {
    let line = doc.line(position.line)?;

    // Layer 1: require targets jump to the resolved file
    if let Some((target, _)) = requires::require_at(line, position.line, position.character) {
        let current = paths::uri_to_path(&doc.uri);
        let resolved = requires::resolve_require(root, current.as_deref(), &target);
        if let Some(path) = resolved.path {
            return Some(Location::file_start(paths::path_to_uri(&path)));
        }
        return None;
    }

    // Layer 2: a `fun` name is its own definition
    if let Some(caps) = FUN_NAME_RE.captures(line) {
        let name = caps.get(1)?;
        if let Some((word, range)) = word_range_at_position(doc, position) {
            if word == name.as_str() {
                return Some(Location::new(doc.uri.clone(), range));
            }
        }
    }

    let (word, _) = word_range_at_position(doc, position)?;

    // Layer 3: declarations in the current file
    if let Some(location) = find_in_current_file(doc, &word) {
        return Some(location);
    }

    // Layer 4: exact then qualified index match
    if let Some(symbol) = index.find_symbol_info(&word, discover_stdlib) {
        return Some(symbol_location(&symbol));
    }

    // Layer 5: accessor-backed instance variables
    if word.starts_with('@') {
        if let Some(symbol) = index.find_property_definition(&word) {
            return Some(symbol_location(&symbol));
        }
    }

    // Layer 6: method calls through a typed receiver
    if let Some(receiver) = receiver_before(line, position, &word) {
        let receiver_type = if receiver
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
        {
            Some(receiver)
        } else {
            type_of_variable(doc.lines(), position.line, &receiver)
        };
        if let Some(receiver_type) = receiver_type {
            if let Some(symbol) = index.find_method_definition(&receiver_type, &word) {
                return Some(symbol_location(&symbol));
            }
        }
    }

    // Layer 7: ask the compiler
    oracle_fallback()
}

/// Declaration patterns for `word` in the document, in fixed precedence:
/// `def` (plain, private, self-qualified), type declarations, constants,
/// accessors, instance-variable declarations.
pub fn find_in_current_file(doc: &Document, word: &str) -> Option<Location> {
    let escaped = regex::escape(word.trim_start_matches('@'));
    let at_escaped = regex::escape(word);

    let patterns: Vec<Regex> = if word.starts_with('@') {
        vec![
            Regex::new(&format!(r"(?:property|getter|setter)[?!]?\s.*\b({escaped})\b")).ok()?,
            Regex::new(&format!(r"({at_escaped})\s*:")).ok()?,
        ]
    } else {
        vec![
            Regex::new(&format!(
                r"^\s*(?:private\s+|protected\s+)?(?:abstract\s+)?def\s+(?:self\.)?({escaped})[\s(:=]"
            ))
            .ok()?,
            Regex::new(&format!(
                r"^\s*(?:private\s+|protected\s+)?(?:abstract\s+)?def\s+(?:self\.)?({escaped})$"
            ))
            .ok()?,
            Regex::new(&format!(
                r"^\s*(?:private\s+)?(?:abstract\s+)?(?:class|module|struct|enum|lib|alias)\s+({escaped})\b"
            ))
            .ok()?,
            Regex::new(&format!(r"^\s*({escaped})\s*=[^=]")).ok()?,
            Regex::new(&format!(
                r"^\s*(?:property|getter|setter)[?!]?\s.*\b({escaped})\b"
            ))
            .ok()?,
        ]
    };

    for pattern in &patterns {
        for (line_no, line) in doc.lines().iter().enumerate() {
            if let Some(caps) = pattern.captures(line) {
                if let Some(group) = caps.get(1) {
                    let start = line[..group.start()].chars().count() as u32;
                    let end = start + group.as_str().chars().count() as u32;
                    return Some(Location::new(
                        doc.uri.clone(),
                        Range::on_line(line_no as u32, start, end),
                    ));
                }
            }
        }
    }
    None
}

/// Build a location for an indexed symbol, pinning the column to the
/// name's occurrence on its line when the file is readable.
pub fn symbol_location(symbol: &SymbolInfo) -> Location {
    let uri = paths::path_to_uri(&symbol.file);
    let short = symbol.short_name();

    let column = std::fs::read_to_string(&symbol.file)
        .ok()
        .and_then(|content| {
            let line = content.split('\n').nth(symbol.line as usize)?.to_string();
            let byte = line.find(short)?;
            Some(line[..byte].chars().count() as u32)
        })
        .unwrap_or(0);

    Location::new(
        uri,
        Range::on_line(
            symbol.line,
            column,
            column + short.chars().count() as u32,
        ),
    )
}

/// When the word at the cursor is called on a receiver (`recv.word`),
/// return the receiver text.
fn receiver_before(line: &str, position: Position, word: &str) -> Option<String> {
    let (_, start, _) = word_at(line, position.character)?;
    let chars: Vec<char> = line.chars().collect();
    let mut index = start as usize;
    // The word itself may begin with `@`; the dot sits right before it
    if index == 0 || chars.get(index - 1) != Some(&'.') {
        return None;
    }
    index -= 1;

    let mut end = index;
    let mut begin = end;
    while begin > 0 {
        let c = chars[begin - 1];
        if crate::utils::is_word_char(c) || c == '@' {
            begin -= 1;
        } else {
            break;
        }
    }
    if begin == end {
        return None;
    }
    let receiver: String = chars[begin..end].iter().collect();
    (!receiver.is_empty() && receiver != *word).then_some(receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("file:///ws/src/test.cr", "crystal", 1, text)
    }

    fn empty_index() -> WorkspaceIndex {
        WorkspaceIndex::new("/nonexistent-liger-def-tests")
    }

    fn define_at(text: &str, line: u32, character: u32) -> Option<Location> {
        let doc = doc(text);
        let mut index = empty_index();
        find_definition(
            &doc,
            Position::new(line, character),
            Path::new("/nonexistent-liger-def-tests"),
            &mut index,
            Vec::new,
            || None,
        )
    }

    #[test]
    fn test_ivar_definition_in_current_file() {
        let text = "class A\n  @x : Int32\n  def foo\n    @x\n  end\nend\n";
        let location = define_at(text, 3, 5).unwrap();
        assert_eq!(location.uri, "file:///ws/src/test.cr");
        assert_eq!(location.range.start.line, 1);
    }

    #[test]
    fn test_method_definition_in_current_file() {
        let text = "def helper\n  1\nend\n\nhelper\n";
        let location = define_at(text, 4, 3).unwrap();
        assert_eq!(location.range.start.line, 0);
        assert_eq!(location.range.start.character, 4);
    }

    #[test]
    fn test_class_definition_in_current_file() {
        let text = "class Widget\nend\n\nWidget.new\n";
        let location = define_at(text, 3, 2).unwrap();
        assert_eq!(location.range.start.line, 0);
        assert_eq!(location.range.start.character, 6);
    }

    #[test]
    fn test_constant_definition() {
        let text = "MAX = 10\n\nputs MAX\n";
        let location = define_at(text, 2, 6).unwrap();
        assert_eq!(location.range.start.line, 0);
        assert_eq!(location.range.start.character, 0);
    }

    #[test]
    fn test_property_definition_for_ivar() {
        let text = "class A\n  property count : Int32\n  def inc\n    @count\n  end\nend\n";
        let location = define_at(text, 3, 6).unwrap();
        assert_eq!(location.range.start.line, 1);
    }

    #[test]
    fn test_fun_is_its_own_definition() {
        let text = "lib C\n  fun getpid : Int32\nend\n";
        let location = define_at(text, 1, 8).unwrap();
        assert_eq!(location.range.start.line, 1);
        assert_eq!(location.range.start.character, 6);
    }

    #[test]
    fn test_whitespace_cursor_finds_nothing() {
        assert!(define_at("def a\nend\n", 0, 3).is_none());
    }

    #[test]
    fn test_oracle_fallback_invoked_when_local_layers_miss() {
        let doc = doc("unknown_call\n");
        let mut index = empty_index();
        let answer = Location::new("file:///elsewhere.cr", Range::on_line(7, 0, 3));
        let expected = answer.clone();
        let location = find_definition(
            &doc,
            Position::new(0, 4),
            Path::new("/nonexistent-liger-def-tests"),
            &mut index,
            Vec::new,
            move || Some(answer),
        );
        assert_eq!(location, Some(expected));
    }

    #[test]
    fn test_receiver_before() {
        assert_eq!(
            receiver_before("user.name", Position::new(0, 6), "name"),
            Some("user".to_string())
        );
        assert_eq!(receiver_before("name", Position::new(0, 2), "name"), None);
        assert_eq!(
            receiver_before("@conn.get", Position::new(0, 7), "get"),
            Some("@conn".to_string())
        );
    }
}

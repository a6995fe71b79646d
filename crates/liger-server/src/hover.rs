//! Hover information, resolved through layered fallback.
//!
//! Require and `fun` lines get synthesized markdown; identifiers go
//! through the current file, then the workspace index, then type
//! inference, then the optional compiler context, and finally a plain
//! "not available" card.

use std::path::Path;
use std::sync::LazyLock;

use liger_core::{Range, SymbolInfo, SymbolKind};
use regex::Regex;

use crate::documents::Document;
use crate::paths;
use crate::requires::{self, RequireKind};
use crate::utils::{doc_comment_above, word_range_at_position};
use crate::workspace::{type_of_variable, WorkspaceIndex};

static FUN_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*fun\s+(\w+)(?:\s*=\s*(?:"([^"]+)"|(\w+)))?"#).expect("fun-line pattern")
});

/// Hover content plus the range it describes.
#[derive(Debug, Clone)]
pub struct HoverInfo {
    pub contents: String,
    pub range: Option<Range>,
}

/// Compute hover information at a position.
///
/// `oracle_context` is invoked only when every local layer misses and the
/// oracle is enabled; it returns opaque type text from the compiler.
pub fn hover(
    doc: &Document,
    position: liger_core::Position,
    root: &Path,
    index: &mut WorkspaceIndex,
    discover_stdlib: impl FnOnce() -> Vec<std::path::PathBuf>,
    oracle_context: impl FnOnce() -> Option<String>,
) -> Option<HoverInfo> {
    let line = doc.line(position.line)?;

    // Layer 1: require lines
    if let Some((target, range)) = requires::require_at(line, position.line, position.character) {
        let current = paths::uri_to_path(&doc.uri);
        let resolved = requires::resolve_require(root, current.as_deref(), &target);
        let mut contents = format!("**require** \"{}\"\n\n{}", target, resolved.kind.describe());
        if let Some(path) = &resolved.path {
            contents.push_str(&format!("\n\nResolves to `{}`", path.display()));
        } else if resolved.kind == RequireKind::Shard {
            contents.push_str("\n\nShard sources not found under `lib/`");
        }
        return Some(HoverInfo {
            contents,
            range: Some(range),
        });
    }

    // Layer 2: extern declarations
    if let Some(caps) = FUN_LINE_RE.captures(line) {
        let name_match = caps.get(1)?;
        let (word, range) = word_range_at_position(doc, position)?;
        if word == name_match.as_str() {
            let c_name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string());
            let contents = match c_name {
                Some(c_name) if c_name != word => format!(
                    "```crystal\n{}\n```\n\nExtern declaration: Crystal name `{}` binds C function `{}`",
                    line.trim(),
                    word,
                    c_name
                ),
                _ => format!(
                    "```crystal\n{}\n```\n\nExtern declaration binding the C function `{}`",
                    line.trim(),
                    word
                ),
            };
            return Some(HoverInfo {
                contents,
                range: Some(range),
            });
        }
    }

    let (word, range) = word_range_at_position(doc, position)?;

    // Layer 3: declarations in the current file
    if let Some(contents) = current_file_hover(doc, &word) {
        return Some(HoverInfo {
            contents,
            range: Some(range),
        });
    }

    // Layer 4: the workspace index
    if let Some(symbol) = index.find_symbol_info(&word, discover_stdlib) {
        let contents = render_symbol(index, &symbol);
        return Some(HoverInfo {
            contents,
            range: Some(range),
        });
    }

    // Layer 5: inferred variable type
    if let Some(type_name) = type_of_variable(doc.lines(), position.line, &word) {
        return Some(HoverInfo {
            contents: format!("```crystal\n{word} : {type_name}\n```"),
            range: Some(range),
        });
    }

    // Layers 6/7: compiler context, then the last-resort card
    if let Some(context) = oracle_context() {
        return Some(HoverInfo {
            contents: format!("```crystal\n{context}\n```"),
            range: Some(range),
        });
    }

    Some(HoverInfo {
        contents: format!("**{word}**\n\nType information not available"),
        range: Some(range),
    })
}

/// Signature + doc comment for a declaration of `word` in the document
/// itself, found with the same line patterns the index scanner uses.
fn current_file_hover(doc: &Document, word: &str) -> Option<String> {
    let path = paths::uri_to_path(&doc.uri).unwrap_or_else(|| doc.uri.clone().into());
    let symbols = crate::workspace::extract_symbols(&path, doc.text());
    let symbol = symbols
        .iter()
        .find(|s| !s.name.contains("::") && (s.name == word || s.short_name() == word))?;

    let mut contents = format!(
        "```crystal\n{}\n```",
        symbol
            .signature
            .clone()
            .unwrap_or_else(|| symbol.name.clone())
    );
    if let Some(doc_text) = doc_comment_above(doc.lines(), symbol.line as usize) {
        contents.push_str("\n\n---\n\n");
        contents.push_str(&doc_text);
    }
    Some(contents)
}

/// Render an indexed symbol: fenced declaration, members or values for
/// containers, documentation when present.
pub fn render_symbol(index: &WorkspaceIndex, symbol: &SymbolInfo) -> String {
    let signature = symbol
        .signature
        .clone()
        .unwrap_or_else(|| format!("{} {}", symbol.kind.keyword(), symbol.name));
    let mut contents = format!("```crystal\n{signature}\n```");

    match symbol.kind {
        SymbolKind::Class | SymbolKind::Struct => {
            let members = index.class_members(&symbol.name);
            if !members.is_empty() {
                contents.push_str("\n\n**Members:**");
                for member in members.iter().take(20) {
                    contents.push_str(&format!(
                        "\n- `{}`",
                        member
                            .signature
                            .clone()
                            .unwrap_or_else(|| member.short_name().to_string())
                    ));
                }
            }
        }
        SymbolKind::Enum => {
            let values = index.enum_values(symbol);
            if !values.is_empty() {
                contents.push_str("\n\n**Values:**");
                for value in values.iter().take(30) {
                    contents.push_str(&format!("\n- `{value}`"));
                }
            }
        }
        _ => {}
    }

    if let Some(doc_text) = &symbol.documentation {
        contents.push_str("\n\n---\n\n");
        contents.push_str(doc_text);
    }
    contents
}

#[cfg(test)]
mod tests {
    use super::*;
    use liger_core::Position;

    fn doc(text: &str) -> Document {
        Document::new("file:///ws/src/test.cr", "crystal", 1, text)
    }

    fn no_stdlib() -> Vec<std::path::PathBuf> {
        Vec::new()
    }

    fn empty_index() -> WorkspaceIndex {
        WorkspaceIndex::new("/nonexistent-liger-hover-tests")
    }

    fn hover_at(text: &str, line: u32, character: u32) -> Option<HoverInfo> {
        let doc = doc(text);
        let mut index = empty_index();
        hover(
            &doc,
            Position::new(line, character),
            Path::new("/nonexistent-liger-hover-tests"),
            &mut index,
            no_stdlib,
            || None,
        )
    }

    #[test]
    fn test_hover_on_whitespace_is_none() {
        assert!(hover_at("foo bar\n", 0, 3).is_none());
    }

    #[test]
    fn test_hover_past_end_of_line_is_none() {
        assert!(hover_at("foo\n", 0, 50).is_none());
    }

    #[test]
    fn test_require_hover() {
        let info = hover_at("require \"json\"\n", 0, 10).unwrap();
        assert!(info.contents.contains("**require**"));
        assert!(info.contents.contains("Standard library or unknown shard"));
    }

    #[test]
    fn test_fun_hover_with_c_name() {
        let info = hover_at("lib LibM\n  fun power = \"pow\"(x : Float64) : Float64\nend\n", 1, 7)
            .unwrap();
        assert!(info.contents.contains("binds C function `pow`"));
    }

    #[test]
    fn test_current_file_method_hover_with_doc() {
        let text = "# Doubles the input.\ndef double(x : Int32) : Int32\n  x * 2\nend\ndouble(2)\n";
        let info = hover_at(text, 4, 1).unwrap();
        assert!(info.contents.contains("```crystal"));
        assert!(info.contents.contains("def double(x : Int32) : Int32"));
        assert!(info.contents.contains("Doubles the input."));
    }

    #[test]
    fn test_inferred_variable_type_hover() {
        let text = "items = [1, 2]\nitems\n";
        let info = hover_at(text, 1, 2).unwrap();
        assert!(info.contents.contains("items : Array"));
    }

    #[test]
    fn test_fallback_hover() {
        let info = hover_at("mystery\n", 0, 3).unwrap();
        assert_eq!(
            info.contents,
            "**mystery**\n\nType information not available"
        );
    }

    #[test]
    fn test_oracle_context_preferred_over_fallback() {
        let doc = doc("mystery\n");
        let mut index = empty_index();
        let info = hover(
            &doc,
            Position::new(0, 3),
            Path::new("/nonexistent"),
            &mut index,
            no_stdlib,
            || Some("mystery : SecretType".to_string()),
        )
        .unwrap();
        assert!(info.contents.contains("SecretType"));
        assert!(info.contents.starts_with("```crystal"));
    }
}

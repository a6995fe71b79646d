//! Completion computation.
//!
//! Dispatches on the shape of the text before the cursor: a receiver
//! followed by a dot, a `::` type path, or a bare prefix. Results are
//! deduplicated by label, first occurrence winning.

use std::sync::LazyLock;

use liger_core::SymbolKind;
use liger_syntax::{Item, Program};
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::builtins::{methods_for_receiver, BUILTIN_TYPES, COMMON_METHODS, KEYWORDS};
use crate::workspace::{type_of_variable, WorkspaceIndex};

static RECEIVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(@?@?\w+[?!]?)\.(\w*)$").expect("receiver pattern"));

/// The kind of a completion item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Keyword,
    Type,
    Method,
    Property,
    Variable,
    Constant,
    Module,
}

/// A completion item before protocol conversion.
#[derive(Debug, Clone)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub detail: Option<String>,
    pub documentation: Option<String>,
}

impl CompletionItem {
    fn new(label: impl Into<String>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            documentation: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Compute completions for the text before the cursor.
///
/// `prefix` is the slice of the cursor's line up to the cursor position;
/// `lines` and `line_no` feed receiver-type inference.
pub fn compute_completions(
    prefix: &str,
    lines: &[String],
    line_no: u32,
    ast: Option<&Program>,
    index: &mut WorkspaceIndex,
) -> Vec<CompletionItem> {
    let items = if let Some(caps) = RECEIVER_RE.captures(prefix) {
        let receiver = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let partial = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        receiver_completions(receiver, partial, lines, line_no, index)
    } else if prefix.contains("::") {
        type_path_completions()
    } else {
        bare_completions(ast, index)
    };

    dedup_by_label(items)
}

/// Methods for `receiver.partial`: curated set for the resolved type,
/// index-derived methods, then the common set.
fn receiver_completions(
    receiver: &str,
    partial: &str,
    lines: &[String],
    line_no: u32,
    index: &mut WorkspaceIndex,
) -> Vec<CompletionItem> {
    let receiver_type = resolve_receiver_type(receiver, lines, line_no);

    let mut items = Vec::new();
    if let Some(type_name) = &receiver_type {
        if let Some(methods) = methods_for_receiver(type_name) {
            for method in methods {
                if method.name.starts_with(partial) {
                    items.push(
                        CompletionItem::new(method.name, CompletionKind::Method)
                            .with_detail(method.signature),
                    );
                }
            }
        }
        for symbol in index.methods_of_type(type_name) {
            let short = symbol.short_name().to_string();
            if short.starts_with(partial) {
                let mut item = CompletionItem::new(short, CompletionKind::Method);
                if let Some(signature) = &symbol.signature {
                    item = item.with_detail(signature.clone());
                }
                item.documentation = symbol.documentation.clone();
                items.push(item);
            }
        }
    }

    for method in COMMON_METHODS {
        items.push(
            CompletionItem::new(method.name, CompletionKind::Method)
                .with_detail(method.signature),
        );
    }
    items
}

/// The receiver's type: a capitalized receiver names itself, otherwise the
/// variable walk-back decides.
fn resolve_receiver_type(receiver: &str, lines: &[String], line_no: u32) -> Option<String> {
    if receiver.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        return Some(receiver.to_string());
    }
    type_of_variable(lines, line_no, receiver)
}

/// `Foo::` paths complete to the built-in type list.
fn type_path_completions() -> Vec<CompletionItem> {
    BUILTIN_TYPES
        .iter()
        .map(|name| CompletionItem::new(*name, CompletionKind::Type).with_detail("built-in type"))
        .collect()
}

/// Bare prefix: keywords, built-in types, file-local declarations,
/// workspace symbols.
fn bare_completions(ast: Option<&Program>, index: &mut WorkspaceIndex) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    for keyword in KEYWORDS {
        items.push(CompletionItem::new(*keyword, CompletionKind::Keyword).with_detail("keyword"));
    }
    for type_name in BUILTIN_TYPES {
        items.push(
            CompletionItem::new(*type_name, CompletionKind::Type).with_detail("built-in type"),
        );
    }

    if let Some(program) = ast {
        for item in program.walk() {
            match item {
                Item::Type(def) => {
                    let kind = match def.keyword {
                        liger_syntax::TypeKeyword::Module => CompletionKind::Module,
                        _ => CompletionKind::Type,
                    };
                    items.push(
                        CompletionItem::new(def.name.clone(), kind)
                            .with_detail(def.keyword.as_str()),
                    );
                }
                Item::Enum(def) => {
                    items.push(
                        CompletionItem::new(def.name.clone(), CompletionKind::Type)
                            .with_detail("enum"),
                    );
                }
                Item::Method(def) => {
                    items.push(
                        CompletionItem::new(def.name.clone(), CompletionKind::Method)
                            .with_detail(def.signature()),
                    );
                }
                Item::Constant(def) => {
                    items.push(CompletionItem::new(
                        def.name.clone(),
                        CompletionKind::Constant,
                    ));
                }
                Item::Accessor(decl) => {
                    for name in &decl.names {
                        items.push(
                            CompletionItem::new(name.name.clone(), CompletionKind::Property),
                        );
                    }
                }
                _ => {}
            }
        }
    }

    index.scan_if_needed();
    for symbol in index.all_symbols() {
        // Qualified duplicates would only clutter the flat list
        if symbol.name.contains("::") {
            continue;
        }
        let kind = match symbol.kind {
            SymbolKind::Class | SymbolKind::Struct | SymbolKind::Enum | SymbolKind::Alias => {
                CompletionKind::Type
            }
            SymbolKind::Module | SymbolKind::Lib => CompletionKind::Module,
            SymbolKind::Method | SymbolKind::Fun => CompletionKind::Method,
            SymbolKind::Property
            | SymbolKind::Getter
            | SymbolKind::Setter
            | SymbolKind::InstanceVariable => CompletionKind::Property,
            SymbolKind::Constant | SymbolKind::EnumMember => CompletionKind::Constant,
            SymbolKind::Variable => CompletionKind::Variable,
        };
        let mut item = CompletionItem::new(symbol.name.clone(), kind);
        if let Some(signature) = &symbol.signature {
            item = item.with_detail(signature.clone());
        }
        items.push(item);
    }

    items
}

fn dedup_by_label(items: Vec<CompletionItem>) -> Vec<CompletionItem> {
    let mut seen = FxHashSet::default();
    items
        .into_iter()
        .filter(|item| seen.insert(item.label.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn empty_index() -> WorkspaceIndex {
        WorkspaceIndex::new(std::env::temp_dir().join("liger-completion-tests-nonexistent"))
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn test_array_receiver_methods() {
        let lines: Vec<String> = vec!["arr = [1, 2]".into(), "arr.".into()];
        let mut index = empty_index();
        let items = compute_completions("arr.", &lines, 1, None, &mut index);

        let found = labels(&items);
        for expected in ["each", "map", "size"] {
            assert!(found.contains(&expected), "missing {expected}");
        }
        // No keywords in receiver completions
        assert!(!found.contains(&"def"));
        assert!(!found.contains(&"class"));
    }

    #[test]
    fn test_receiver_partial_filters_typed_methods() {
        let lines: Vec<String> = vec!["s = \"hi\"".into(), "s.up".into()];
        let mut index = empty_index();
        let items = compute_completions("s.up", &lines, 1, None, &mut index);
        let found = labels(&items);
        assert!(found.contains(&"upcase"));
        assert!(!found.contains(&"downcase"));
    }

    #[test]
    fn test_type_path_completions() {
        let mut index = empty_index();
        let items = compute_completions("Foo::", &[], 0, None, &mut index);
        let found = labels(&items);
        assert!(found.contains(&"String"));
        assert!(found.contains(&"Int32"));
        assert!(!found.contains(&"def"));
    }

    #[test]
    fn test_bare_completions_include_file_symbols() {
        let text = "class Widget\nend\ndef helper\nend\n";
        let program = liger_syntax::parse(text).unwrap();
        let mut index = empty_index();
        let items = compute_completions("", &[], 0, Some(&program), &mut index);
        let found = labels(&items);

        assert!(found.contains(&"def"));
        assert!(found.contains(&"String"));
        assert!(found.contains(&"Widget"));
        assert!(found.contains(&"helper"));
    }

    #[test]
    fn test_workspace_symbols_in_bare_completions() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/z.cr"), "class FromWorkspace\nend\n").unwrap();
        let mut index = WorkspaceIndex::new(dir.path());

        let items = compute_completions("", &[], 0, None, &mut index);
        assert!(labels(&items).contains(&"FromWorkspace"));
    }

    #[test]
    fn test_dedup_keeps_first() {
        let items = vec![
            CompletionItem::new("x", CompletionKind::Keyword).with_detail("first"),
            CompletionItem::new("x", CompletionKind::Method).with_detail("second"),
        ];
        let deduped = dedup_by_label(items);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].detail.as_deref(), Some("first"));
    }

    #[test]
    fn test_common_methods_always_present_on_receiver() {
        let lines: Vec<String> = vec!["mystery.".into()];
        let mut index = empty_index();
        let items = compute_completions("mystery.", &lines, 0, None, &mut index);
        let found = labels(&items);
        assert!(found.contains(&"to_s"));
        assert!(found.contains(&"inspect"));
    }
}

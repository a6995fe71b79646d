//! Document symbol trees from the declaration AST.

use liger_core::{Range, SymbolKind};
use liger_syntax::{Item, Program};

use crate::utils::span_to_range;

/// A symbol in a document with its nesting preserved.
#[derive(Debug, Clone)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Full span of the declaration, through its `end`.
    pub range: Range,
    /// Span of the name token.
    pub selection_range: Range,
    pub detail: Option<String>,
    pub children: Vec<DocumentSymbol>,
}

/// Build the document symbol tree for a parsed file.
pub fn document_symbols(text: &str, program: &Program) -> Vec<DocumentSymbol> {
    items_to_symbols(text, &program.items, true)
}

fn items_to_symbols(text: &str, items: &[Item], top_level: bool) -> Vec<DocumentSymbol> {
    let mut symbols = Vec::new();

    for item in items {
        match item {
            Item::Type(def) => {
                let kind = match def.keyword {
                    liger_syntax::TypeKeyword::Class => SymbolKind::Class,
                    liger_syntax::TypeKeyword::Module => SymbolKind::Module,
                    liger_syntax::TypeKeyword::Struct => SymbolKind::Struct,
                    liger_syntax::TypeKeyword::Lib => SymbolKind::Lib,
                };
                symbols.push(DocumentSymbol {
                    name: def.name.clone(),
                    kind,
                    range: span_to_range(text, &def.span),
                    selection_range: span_to_range(text, &def.name_span),
                    detail: def.superclass.clone(),
                    children: items_to_symbols(text, &def.body, false),
                });
            }
            Item::Enum(def) => {
                let mut children: Vec<DocumentSymbol> = def
                    .members
                    .iter()
                    .map(|member| DocumentSymbol {
                        name: member.name.clone(),
                        kind: SymbolKind::EnumMember,
                        range: span_to_range(text, &member.span),
                        selection_range: span_to_range(text, &member.span),
                        detail: None,
                        children: Vec::new(),
                    })
                    .collect();
                children.extend(items_to_symbols(text, &def.body, false));

                symbols.push(DocumentSymbol {
                    name: def.name.clone(),
                    kind: SymbolKind::Enum,
                    range: span_to_range(text, &def.span),
                    selection_range: span_to_range(text, &def.name_span),
                    detail: def.base.clone(),
                    children,
                });
            }
            Item::Method(def) => {
                let display = match &def.receiver {
                    Some(receiver) => format!("{receiver}.{}", def.name),
                    None => def.name.clone(),
                };
                symbols.push(DocumentSymbol {
                    name: display,
                    kind: SymbolKind::Method,
                    range: span_to_range(text, &def.span),
                    selection_range: span_to_range(text, &def.name_span),
                    detail: def.return_type.clone(),
                    children: items_to_symbols(text, &def.body, false),
                });
            }
            Item::Fun(decl) => {
                symbols.push(DocumentSymbol {
                    name: decl.name.clone(),
                    kind: SymbolKind::Fun,
                    range: span_to_range(text, &decl.span),
                    selection_range: span_to_range(text, &decl.name_span),
                    detail: decl.return_type.clone(),
                    children: Vec::new(),
                });
            }
            Item::Alias(def) => {
                symbols.push(DocumentSymbol {
                    name: def.name.clone(),
                    kind: SymbolKind::Alias,
                    range: span_to_range(text, &def.span),
                    selection_range: span_to_range(text, &def.name_span),
                    detail: Some(def.target.clone()),
                    children: Vec::new(),
                });
            }
            Item::Accessor(decl) => {
                let kind = match decl.kind {
                    liger_syntax::AccessorKind::Property => SymbolKind::Property,
                    liger_syntax::AccessorKind::Getter => SymbolKind::Getter,
                    liger_syntax::AccessorKind::Setter => SymbolKind::Setter,
                };
                for name in &decl.names {
                    symbols.push(DocumentSymbol {
                        name: name.name.clone(),
                        kind,
                        range: span_to_range(text, &decl.span),
                        selection_range: span_to_range(text, &name.name_span),
                        detail: name.type_name.clone(),
                        children: Vec::new(),
                    });
                }
            }
            Item::InstanceVar(decl) => {
                symbols.push(DocumentSymbol {
                    name: decl.name.clone(),
                    kind: SymbolKind::InstanceVariable,
                    range: span_to_range(text, &decl.span),
                    selection_range: span_to_range(text, &decl.name_span),
                    detail: Some(decl.type_name.clone()),
                    children: Vec::new(),
                });
            }
            Item::Constant(def) => {
                symbols.push(DocumentSymbol {
                    name: def.name.clone(),
                    kind: SymbolKind::Constant,
                    range: span_to_range(text, &def.span),
                    selection_range: span_to_range(text, &def.name_span),
                    detail: None,
                    children: Vec::new(),
                });
            }
            Item::Assign(stmt) if top_level => {
                symbols.push(DocumentSymbol {
                    name: stmt.name.clone(),
                    kind: SymbolKind::Variable,
                    range: span_to_range(text, &stmt.span),
                    selection_range: span_to_range(text, &stmt.name_span),
                    detail: None,
                    children: Vec::new(),
                });
            }
            Item::Assign(_) | Item::Require(_) => {}
        }
    }

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(text: &str) -> Vec<DocumentSymbol> {
        let program = liger_syntax::parse(text).unwrap();
        document_symbols(text, &program)
    }

    #[test]
    fn test_nested_module_class_method() {
        let text = "module M\n  class C\n    def m\n    end\n  end\nend\n";
        let tree = symbols(text);

        assert_eq!(tree.len(), 1);
        let module = &tree[0];
        assert_eq!(module.name, "M");
        assert_eq!(module.kind, SymbolKind::Module);

        let class = &module.children[0];
        assert_eq!(class.name, "C");
        assert_eq!(class.kind, SymbolKind::Class);

        let method = &class.children[0];
        assert_eq!(method.name, "m");
        assert_eq!(method.kind, SymbolKind::Method);

        // selectionRange covers each name exactly
        assert_eq!(module.selection_range, Range::on_line(0, 7, 8));
        assert_eq!(class.selection_range, Range::on_line(1, 8, 9));
        assert_eq!(method.selection_range, Range::on_line(2, 8, 9));
    }

    #[test]
    fn test_full_range_spans_to_end() {
        let text = "class C\n  def m\n  end\nend\n";
        let tree = symbols(text);
        let class = &tree[0];
        assert_eq!(class.range.start.line, 0);
        assert_eq!(class.range.end.line, 3);
    }

    #[test]
    fn test_empty_document_yields_no_symbols() {
        assert!(symbols("").is_empty());
    }

    #[test]
    fn test_top_level_assignment_included_nested_excluded() {
        let text = "total = 0\ndef bump\n  local = 1\nend\n";
        let tree = symbols(text);
        let names: Vec<_> = tree.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["total", "bump"]);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn test_enum_members_are_children() {
        let text = "enum Color\n  Red\n  Green\nend\n";
        let tree = symbols(text);
        let color = &tree[0];
        assert_eq!(color.kind, SymbolKind::Enum);
        let member_names: Vec<_> = color.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(member_names, vec!["Red", "Green"]);
        assert!(color
            .children
            .iter()
            .all(|c| c.kind == SymbolKind::EnumMember));
    }

    #[test]
    fn test_class_method_display_name() {
        let text = "class F\n  def self.build\n  end\nend\n";
        let tree = symbols(text);
        assert_eq!(tree[0].children[0].name, "self.build");
    }
}

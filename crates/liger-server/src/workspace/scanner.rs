//! Line-based symbol extraction for workspace files.
//!
//! A small table of compiled patterns, tried in a fixed order per line:
//! keyworded declarations first, `CONST = value` before any other
//! assignment shape. A namespace stack with indentation levels qualifies
//! nested symbols; every nested declaration is emitted under both its
//! short and fully qualified name.

use std::path::Path;
use std::sync::LazyLock;

use liger_core::{SymbolInfo, SymbolKind};
use regex::Regex;

use super::infer::infer_type;
use crate::utils::{doc_comment_above, indent_of};

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:private\s+)?(?:abstract\s+)?class\s+([A-Z]\w*(?:::[A-Z]\w*)*)(?:\([^)]*\))?(?:\s*<\s*([A-Za-z_][\w:()]*))?")
        .expect("class pattern")
});

static MODULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:private\s+)?module\s+([A-Z]\w*(?:::[A-Z]\w*)*)").expect("module pattern")
});

static STRUCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:private\s+)?(?:abstract\s+)?struct\s+([A-Z]\w*(?:::[A-Z]\w*)*)")
        .expect("struct pattern")
});

static ENUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:private\s+)?enum\s+([A-Z]\w*(?:::[A-Z]\w*)*)(?:\s*:\s*(\w+))?")
        .expect("enum pattern")
});

static LIB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*lib\s+([A-Z]\w*)").expect("lib pattern"));

static FUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*fun\s+([a-z_]\w*)(?:\s*=\s*(?:"([^"]+)"|([\w]+)))?\s*(?:\(([^)]*)\))?\s*(?::\s*(.+?))?\s*$"#)
        .expect("fun pattern")
});

static DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:private\s+|protected\s+)?(?:abstract\s+)?def\s+(?:(self)\.)?([a-z_]\w*[?!]?|[A-Z]\w*\.[a-z_]\w*[?!]?|(?:\[\]=?|<=>|==|=~|[+\-*/%<>!&|^~]+))\s*(?:\(([^)]*)\))?\s*(?::\s*([^=]+?))?\s*(?:=\s*.*)?$")
        .expect("def pattern")
});

static ACCESSOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(property|getter|setter)[?!]?\s+(.+)$").expect("accessor pattern")
});

static IVAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(@@?\w+)\s*:\s*([^=]+?)\s*(?:=.*)?$").expect("ivar pattern")
});

static CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Z]\w*)\s*=\s*([^=~].*)$").expect("constant pattern")
});

static ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*alias\s+([A-Z]\w*)\s*=\s*(.+)$").expect("alias pattern")
});

static END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*end\s*(?:#.*)?$").expect("end pattern"));

static RETURN_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*return\s+(.+)$").expect("return pattern"));

/// Extract all symbols from one file's content.
pub fn extract_symbols(path: &Path, content: &str) -> Vec<SymbolInfo> {
    let lines: Vec<String> = content.split('\n').map(|s| s.to_string()).collect();
    let mut scanner = Scanner {
        path,
        lines: &lines,
        symbols: Vec::new(),
        namespaces: Vec::new(),
    };
    scanner.run();
    scanner.symbols
}

struct Scanner<'a> {
    path: &'a Path,
    lines: &'a [String],
    symbols: Vec<SymbolInfo>,
    /// Open `class` / `module` / `lib` declarations with their indentation.
    namespaces: Vec<(String, usize)>,
}

impl<'a> Scanner<'a> {
    fn run(&mut self) {
        for index in 0..self.lines.len() {
            let line = &self.lines[index];
            let indent = indent_of(line);

            if END_RE.is_match(line) {
                if let Some((_, top_indent)) = self.namespaces.last() {
                    if indent <= *top_indent {
                        self.namespaces.pop();
                    }
                }
                continue;
            }

            self.scan_line(index as u32, line, indent);
        }
    }

    /// Patterns in fixed precedence: keyworded declarations, then
    /// accessor macros, then `@ivar :`, then `CONST =`, then `alias`.
    fn scan_line(&mut self, line_no: u32, line: &str, indent: usize) {
        if let Some(caps) = CLASS_RE.captures(line) {
            let name = caps[1].to_string();
            let parent = caps.get(2).map(|m| m.as_str().to_string());
            self.emit(
                SymbolInfo::new(
                    name.clone(),
                    SymbolKind::Class,
                    parent.unwrap_or_else(|| "Object".to_string()),
                    self.path,
                    line_no,
                )
                .with_signature(line.trim()),
                line_no,
            );
            self.namespaces.push((name, indent));
            return;
        }

        if let Some(caps) = MODULE_RE.captures(line) {
            let name = caps[1].to_string();
            self.emit(
                SymbolInfo::new(name.clone(), SymbolKind::Module, "Module", self.path, line_no)
                    .with_signature(line.trim()),
                line_no,
            );
            self.namespaces.push((name, indent));
            return;
        }

        if let Some(caps) = STRUCT_RE.captures(line) {
            self.emit(
                SymbolInfo::new(&caps[1], SymbolKind::Struct, "Struct", self.path, line_no)
                    .with_signature(line.trim()),
                line_no,
            );
            return;
        }

        if let Some(caps) = ENUM_RE.captures(line) {
            self.emit(
                SymbolInfo::new(&caps[1], SymbolKind::Enum, "Enum", self.path, line_no)
                    .with_signature(line.trim()),
                line_no,
            );
            return;
        }

        if let Some(caps) = LIB_RE.captures(line) {
            let name = caps[1].to_string();
            self.emit(
                SymbolInfo::new(name.clone(), SymbolKind::Lib, "Lib", self.path, line_no)
                    .with_signature(line.trim()),
                line_no,
            );
            self.namespaces.push((name, indent));
            return;
        }

        if let Some(caps) = FUN_RE.captures(line) {
            let name = caps[1].to_string();
            let c_name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string());
            let params = caps.get(4).map(|m| m.as_str()).unwrap_or("");
            let return_type = caps.get(5).map(|m| m.as_str().trim()).unwrap_or("Void");

            let mut signature = format!("fun {name}");
            if let Some(c_name) = &c_name {
                signature.push_str(&format!(" = {c_name}"));
            }
            if !params.is_empty() {
                signature.push_str(&format!("({params})"));
            }
            signature.push_str(&format!(" : {return_type}"));

            self.emit(
                SymbolInfo::new(name, SymbolKind::Fun, return_type, self.path, line_no)
                    .with_signature(signature),
                line_no,
            );
            return;
        }

        if let Some(caps) = DEF_RE.captures(line) {
            let is_class_method = caps.get(1).is_some();
            let name = caps[2].to_string();
            let params = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            let return_type = match caps.get(4) {
                Some(m) => m.as_str().trim().to_string(),
                None => self.infer_return_type(line_no, indent),
            };

            let mut signature = String::from("def ");
            if is_class_method {
                signature.push_str("self.");
            }
            signature.push_str(&name);
            if !params.is_empty() {
                signature.push_str(&format!("({params})"));
            }
            if !return_type.is_empty() {
                signature.push_str(&format!(" : {return_type}"));
            }

            self.emit(
                SymbolInfo::new(name, SymbolKind::Method, return_type, self.path, line_no)
                    .with_signature(signature),
                line_no,
            );
            return;
        }

        if let Some(caps) = ACCESSOR_RE.captures(line) {
            let kind = match &caps[1] {
                "property" => SymbolKind::Property,
                "getter" => SymbolKind::Getter,
                _ => SymbolKind::Setter,
            };
            for entry in split_top_level(caps.get(2).map(|m| m.as_str()).unwrap_or("")) {
                let entry = entry.trim();
                if entry.is_empty() {
                    continue;
                }
                // Symbol-style declarations: `getter :foo`
                let entry = if entry.starts_with(':') {
                    entry[1..].trim()
                } else {
                    entry
                };
                let (name, type_name) = match entry.split_once(':') {
                    Some((n, t)) => (
                        n.trim(),
                        t.split('=').next().unwrap_or(t).trim().to_string(),
                    ),
                    None => (entry.split('=').next().unwrap_or(entry).trim(), "Object".to_string()),
                };
                if name.is_empty() || !name.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c == '_') {
                    continue;
                }
                let signature = format!("{} {} : {}", &caps[1], name, type_name);
                self.emit(
                    SymbolInfo::new(format!("@{name}"), kind, type_name, self.path, line_no)
                        .with_signature(signature),
                    line_no,
                );
            }
            return;
        }

        if let Some(caps) = IVAR_RE.captures(line) {
            let name = caps[1].to_string();
            let type_name = caps[2].trim().to_string();
            self.emit(
                SymbolInfo::new(
                    name.clone(),
                    SymbolKind::InstanceVariable,
                    type_name.clone(),
                    self.path,
                    line_no,
                )
                .with_signature(format!("{name} : {type_name}")),
                line_no,
            );
            return;
        }

        if let Some(caps) = CONST_RE.captures(line) {
            let name = caps[1].to_string();
            let value = caps[2].trim();
            self.emit(
                SymbolInfo::new(
                    name.clone(),
                    SymbolKind::Constant,
                    infer_type(value),
                    self.path,
                    line_no,
                )
                .with_signature(format!("{name} = {value}")),
                line_no,
            );
            return;
        }

        if let Some(caps) = ALIAS_RE.captures(line) {
            let name = caps[1].to_string();
            let target = caps[2].trim().to_string();
            self.emit(
                SymbolInfo::new(name.clone(), SymbolKind::Alias, target.clone(), self.path, line_no)
                    .with_signature(format!("alias {name} = {target}")),
                line_no,
            );
        }
    }

    /// Emit a symbol under its short name and, when a namespace is open,
    /// under the fully qualified name as well.
    fn emit(&mut self, symbol: SymbolInfo, line_no: u32) {
        let symbol = match doc_comment_above(self.lines, line_no as usize) {
            Some(doc) => symbol.with_documentation(doc),
            None => symbol,
        };

        if !self.namespaces.is_empty() {
            let namespace = self
                .namespaces
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join("::");
            let mut qualified = symbol.clone();
            qualified.name = format!("{namespace}::{}", symbol.name);
            self.symbols.push(qualified);
        }
        self.symbols.push(symbol);
    }

    /// Infer a method's return type from its body: the last `return value`
    /// or the final expression before the closing `end`.
    fn infer_return_type(&self, def_line: u32, def_indent: usize) -> String {
        let mut last_expr: Option<&str> = None;
        for line in self.lines.iter().skip(def_line as usize + 1) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if indent_of(line) <= def_indent {
                if trimmed == "end" {
                    break;
                }
                // One-line body or malformed nesting; stop looking
                break;
            }
            if let Some(caps) = RETURN_VALUE_RE.captures(line) {
                let value = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                return infer_type(value);
            }
            last_expr = Some(trimmed);
        }
        match last_expr {
            Some(expr) => {
                let inferred = infer_type(expr);
                if inferred == "Object" {
                    String::new()
                } else {
                    inferred
                }
            }
            None => String::new(),
        }
    }
}

/// Split a declaration list on commas outside brackets.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (index, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                pieces.push(&text[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);
    pieces
}

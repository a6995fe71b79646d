//! Symbol descriptions produced by workspace scanning.

use std::path::PathBuf;

/// The kind of a symbol extracted from Crystal source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Module,
    Struct,
    Enum,
    EnumMember,
    Lib,
    Fun,
    Method,
    Property,
    Getter,
    Setter,
    InstanceVariable,
    Variable,
    Constant,
    Alias,
}

impl SymbolKind {
    /// The Crystal keyword (or closest tag) used when rendering this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Module => "module",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum member",
            SymbolKind::Lib => "lib",
            SymbolKind::Fun => "fun",
            SymbolKind::Method => "def",
            SymbolKind::Property => "property",
            SymbolKind::Getter => "getter",
            SymbolKind::Setter => "setter",
            SymbolKind::InstanceVariable => "instance variable",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Alias => "alias",
        }
    }

    /// Whether this kind is a container that can hold members.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Module
                | SymbolKind::Struct
                | SymbolKind::Enum
                | SymbolKind::Lib
        )
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A symbol found in a Crystal source file.
///
/// `name` is either a simple identifier or a `::`-qualified path; nested
/// declarations are recorded under both forms. `type_name` holds the return
/// type for methods, the parent class for classes, or a literal tag such as
/// `"Module"` for containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    pub type_name: String,
    /// Absolute path of the file the symbol was found in.
    pub file: PathBuf,
    /// 0-based line of the declaration.
    pub line: u32,
    /// Rendered declaration line, e.g. `def parse(input : String) : Ast`.
    pub signature: Option<String>,
    /// The contiguous `#` comment block immediately above the declaration.
    pub documentation: Option<String>,
}

impl SymbolInfo {
    /// Create a symbol with the mandatory fields; signature and
    /// documentation start out empty.
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        type_name: impl Into<String>,
        file: impl Into<PathBuf>,
        line: u32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            type_name: type_name.into(),
            file: file.into(),
            line,
            signature: None,
            documentation: None,
        }
    }

    /// Attach a rendered signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Attach extracted documentation, dropping empty blocks.
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        let documentation = documentation.into();
        if !documentation.is_empty() {
            self.documentation = Some(documentation);
        }
        self
    }

    /// The last path segment of a possibly `::`-qualified name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_of_qualified_symbol() {
        let sym = SymbolInfo::new("Outer::Inner::Leaf", SymbolKind::Class, "Class", "/x.cr", 3);
        assert_eq!(sym.short_name(), "Leaf");

        let plain = SymbolInfo::new("Leaf", SymbolKind::Class, "Class", "/x.cr", 3);
        assert_eq!(plain.short_name(), "Leaf");
    }

    #[test]
    fn test_with_documentation_drops_empty() {
        let sym = SymbolInfo::new("x", SymbolKind::Variable, "Int32", "/x.cr", 0)
            .with_documentation(String::new());
        assert!(sym.documentation.is_none());
    }

    #[test]
    fn test_container_kinds() {
        assert!(SymbolKind::Class.is_container());
        assert!(SymbolKind::Lib.is_container());
        assert!(!SymbolKind::Method.is_container());
        assert!(!SymbolKind::Constant.is_container());
    }
}

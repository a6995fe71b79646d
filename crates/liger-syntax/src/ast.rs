//! Declaration-level AST for Crystal source.
//!
//! The parser is an outline parser: it models every construct that declares
//! a name (types, methods, accessors, constants, assignments) with precise
//! spans, and treats expression-level code as opaque. Declarations nested
//! inside opaque blocks (e.g. a `def` guarded by `if`) are spliced into the
//! enclosing body.

use crate::Span;

/// A parsed source file.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Iterate over all items in the file, recursing into type bodies.
    pub fn walk(&self) -> impl Iterator<Item = &Item> {
        let mut stack: Vec<&Item> = self.items.iter().rev().collect();
        std::iter::from_fn(move || {
            let item = stack.pop()?;
            for child in item.children().iter().rev() {
                stack.push(child);
            }
            Some(item)
        })
    }

    /// All `require` statements in the file.
    pub fn requires(&self) -> impl Iterator<Item = &RequireStmt> {
        self.items.iter().filter_map(|item| match item {
            Item::Require(require) => Some(require),
            _ => None,
        })
    }
}

/// The kind of a type-like container declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKeyword {
    Class,
    Module,
    Struct,
    Lib,
}

impl TypeKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKeyword::Class => "class",
            TypeKeyword::Module => "module",
            TypeKeyword::Struct => "struct",
            TypeKeyword::Lib => "lib",
        }
    }
}

/// A top-level or nested item.
#[derive(Debug, Clone)]
pub enum Item {
    Require(RequireStmt),
    Type(TypeDef),
    Enum(EnumDef),
    Method(MethodDef),
    Fun(FunDecl),
    Alias(AliasDef),
    Accessor(AccessorDecl),
    InstanceVar(IvarDecl),
    Constant(ConstantDef),
    Assign(AssignStmt),
}

impl Item {
    /// Nested items, if this item is a container.
    pub fn children(&self) -> &[Item] {
        match self {
            Item::Type(def) => &def.body,
            Item::Enum(def) => &def.body,
            Item::Method(def) => &def.body,
            _ => &[],
        }
    }

    /// The full span of the item, through its `end` when it has one.
    pub fn span(&self) -> Span {
        match self {
            Item::Require(node) => node.span,
            Item::Type(node) => node.span,
            Item::Enum(node) => node.span,
            Item::Method(node) => node.span,
            Item::Fun(node) => node.span,
            Item::Alias(node) => node.span,
            Item::Accessor(node) => node.span,
            Item::InstanceVar(node) => node.span,
            Item::Constant(node) => node.span,
            Item::Assign(node) => node.span,
        }
    }
}

/// `require "path"`
#[derive(Debug, Clone)]
pub struct RequireStmt {
    /// The quoted path, without quotes.
    pub path: String,
    pub span: Span,
    /// Span of the quoted string including quotes.
    pub path_span: Span,
}

/// `class X < Y ... end`, `module X ... end`, `struct X ... end`,
/// `lib X ... end`
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub keyword: TypeKeyword,
    pub name: String,
    /// Superclass path for `class X < Y`, included module semantics are not
    /// tracked.
    pub superclass: Option<String>,
    pub is_abstract: bool,
    pub body: Vec<Item>,
    pub span: Span,
    pub name_span: Span,
}

/// `enum X ... end`
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    /// Base type for `enum X : UInt8`.
    pub base: Option<String>,
    pub members: Vec<EnumMember>,
    /// Methods and other declarations inside the enum.
    pub body: Vec<Item>,
    pub span: Span,
    pub name_span: Span,
}

/// A single member line inside an `enum` body.
#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: String,
    pub span: Span,
}

/// `def name(params) : T ... end`, including `def self.name` and the
/// short form `def name = expr`.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    /// `Some("self")` for class methods.
    pub receiver: Option<String>,
    pub params: Vec<Param>,
    /// Raw text between the parameter parentheses.
    pub params_src: String,
    pub return_type: Option<String>,
    pub is_private: bool,
    pub is_abstract: bool,
    pub body: Vec<Item>,
    pub span: Span,
    pub name_span: Span,
}

impl MethodDef {
    /// Render a Crystal-style signature line.
    pub fn signature(&self) -> String {
        let mut sig = String::from("def ");
        if let Some(receiver) = &self.receiver {
            sig.push_str(receiver);
            sig.push('.');
        }
        sig.push_str(&self.name);
        if !self.params_src.is_empty() {
            sig.push('(');
            sig.push_str(&self.params_src);
            sig.push(')');
        }
        if let Some(ret) = &self.return_type {
            sig.push_str(" : ");
            sig.push_str(ret);
        }
        sig
    }
}

/// A method parameter. Splat, block, and default-value markers are
/// stripped from the name.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_name: Option<String>,
}

/// `fun name = CName(params) : T` (inside `lib`) or a top-level
/// `fun name ... end` definition.
#[derive(Debug, Clone)]
pub struct FunDecl {
    pub name: String,
    /// The C-side name for `fun crystal_name = c_name(...)`.
    pub c_name: Option<String>,
    pub params_src: String,
    pub return_type: Option<String>,
    pub span: Span,
    pub name_span: Span,
}

impl FunDecl {
    /// Render a `fun` signature line.
    pub fn signature(&self) -> String {
        let mut sig = format!("fun {}", self.name);
        if let Some(c_name) = &self.c_name {
            sig.push_str(" = ");
            sig.push_str(c_name);
        }
        if !self.params_src.is_empty() {
            sig.push('(');
            sig.push_str(&self.params_src);
            sig.push(')');
        }
        if let Some(ret) = &self.return_type {
            sig.push_str(" : ");
            sig.push_str(ret);
        }
        sig
    }
}

/// `alias Name = Target`
#[derive(Debug, Clone)]
pub struct AliasDef {
    pub name: String,
    pub target: String,
    pub span: Span,
    pub name_span: Span,
}

/// The accessor macro used in a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Property,
    Getter,
    Setter,
}

impl AccessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessorKind::Property => "property",
            AccessorKind::Getter => "getter",
            AccessorKind::Setter => "setter",
        }
    }

    pub fn from_word(word: &str) -> Option<AccessorKind> {
        Some(match word.trim_end_matches(['?', '!']) {
            "property" => AccessorKind::Property,
            "getter" => AccessorKind::Getter,
            "setter" => AccessorKind::Setter,
            _ => return None,
        })
    }
}

/// One declared accessor name with an optional type.
#[derive(Debug, Clone)]
pub struct AccessorName {
    pub name: String,
    pub type_name: Option<String>,
    pub name_span: Span,
}

/// `property foo : String, bar : Int32` and friends.
#[derive(Debug, Clone)]
pub struct AccessorDecl {
    pub kind: AccessorKind,
    pub names: Vec<AccessorName>,
    pub span: Span,
}

/// `@name : Type` instance (or `@@name` class) variable declaration.
#[derive(Debug, Clone)]
pub struct IvarDecl {
    /// Name including the `@` sigil(s).
    pub name: String,
    pub type_name: String,
    pub span: Span,
    pub name_span: Span,
}

/// `NAME = value`
#[derive(Debug, Clone)]
pub struct ConstantDef {
    pub name: String,
    /// Raw text of the right-hand side.
    pub value: String,
    pub span: Span,
    pub name_span: Span,
}

/// `name = value` variable assignment.
#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub name: String,
    /// Raw text of the right-hand side.
    pub value: String,
    pub span: Span,
    pub name_span: Span,
}

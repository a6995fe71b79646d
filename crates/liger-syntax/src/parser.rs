//! Outline parser for Crystal source.
//!
//! Parses declarations (types, methods, accessors, constants, assignments)
//! with exact spans and skips expression-level code, while keeping
//! `do`/`if`/`case`/`begin` ... `end` block structure balanced so that
//! nesting and missing-`end` detection stay correct.

use crate::ast::*;
use crate::token::{Keyword, Token, TokenKind};
use crate::{Span, SyntaxError};

/// Body context, which changes how a few line shapes are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyCtx {
    TopLevel,
    Type,
    Enum,
    Lib,
    Method,
    Opaque,
}

/// The parser for Crystal source code.
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    current: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, Span::dummy()));
        }
        Self {
            source,
            tokens,
            current: 0,
        }
    }

    /// Parse a complete source file.
    pub fn parse_program(&mut self) -> Result<Program, SyntaxError> {
        let items = self.parse_body(BodyCtx::TopLevel, None)?;
        Ok(Program::new(items))
    }

    // === token plumbing ===

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.current + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current.min(self.tokens.len() - 1)].clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn previous_span(&self) -> Span {
        if self.current == 0 {
            return Span::dummy();
        }
        self.tokens[self.current - 1].span
    }

    fn at_terminator(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> SyntaxError {
        SyntaxError::new(message, span)
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        self.source.get(start..end).unwrap_or("")
    }

    // === line helpers ===

    /// Consume the rest of the logical line including its terminator.
    /// Returns the net block balance of the consumed tokens: `do` keywords
    /// open, `end` keywords close.
    fn skip_line(&mut self) -> i32 {
        let mut net = 0i32;
        while !self.at_terminator() {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Do) => net += 1,
                TokenKind::Keyword(Keyword::End) => net -= 1,
                _ => {}
            }
            self.advance();
        }
        if matches!(self.peek_kind(), TokenKind::Newline) {
            self.advance();
        }
        net
    }

    /// Consume the rest of the line and capture its raw source text.
    fn capture_line(&mut self) -> (String, i32) {
        let start = self.peek().span.start;
        let mut end = start;
        let mut net = 0i32;
        while !self.at_terminator() {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Do) => net += 1,
                TokenKind::Keyword(Keyword::End) => net -= 1,
                _ => {}
            }
            end = self.peek().span.end;
            self.advance();
        }
        if matches!(self.peek_kind(), TokenKind::Newline) {
            self.advance();
        }
        (self.slice(start, end).trim().to_string(), net)
    }

    /// Capture a type expression: everything up to a top-level `,`, `=`,
    /// or the end of the line.
    fn capture_type(&mut self) -> String {
        let start = self.peek().span.start;
        let mut end = start;
        let mut depth = 0i32;
        loop {
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Eof => break,
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::Comma | TokenKind::Eq if depth == 0 => break,
                TokenKind::Ident(word) if depth == 0 && word == "forall" => break,
                _ => {}
            }
            end = self.peek().span.end;
            self.advance();
        }
        self.slice(start, end).trim().to_string()
    }

    /// Consume a `Const(::Const)*` path, returning the joined name and its
    /// span. Generic arguments like `(T)` directly after the path are
    /// consumed but not part of the name.
    fn parse_const_path(&mut self) -> Result<(String, Span), SyntaxError> {
        let first = match self.peek_kind() {
            TokenKind::Const(_) => self.advance(),
            _ => {
                return Err(self.error("expected a type name", self.peek().span));
            }
        };
        let mut span = first.span;
        let mut name = match first.kind {
            TokenKind::Const(name) => name,
            _ => unreachable!(),
        };

        while matches!(self.peek_kind(), TokenKind::ColonColon)
            && matches!(self.peek_at(1).kind, TokenKind::Const(_))
        {
            self.advance();
            let segment = self.advance();
            span = span.to(&segment.span);
            name.push_str("::");
            if let TokenKind::Const(text) = segment.kind {
                name.push_str(&text);
            }
        }

        // Generic parameter list on the declaration
        if matches!(self.peek_kind(), TokenKind::LParen) {
            let mut depth = 0i32;
            loop {
                match self.peek_kind() {
                    TokenKind::LParen => depth += 1,
                    TokenKind::RParen => {
                        self.advance();
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        continue;
                    }
                    TokenKind::Newline | TokenKind::Eof => break,
                    _ => {}
                }
                self.advance();
            }
        }

        Ok((name, span))
    }

    /// Capture raw text between balanced parentheses. The opening paren
    /// must be the current token.
    fn capture_parenthesized(&mut self) -> Result<String, SyntaxError> {
        let open = self.advance(); // `(`
        let start = self.peek().span.start;
        let mut end = start;
        let mut depth = 1i32;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                TokenKind::Eof => {
                    return Err(self.error("unclosed parenthesis", open.span));
                }
                _ => {}
            }
            end = self.peek().span.end;
            self.advance();
        }
        Ok(self.slice(start, end).trim().to_string())
    }

    // === body parsing ===

    /// Parse items until the matching `end` (when `opener` is given) or
    /// end of input.
    fn parse_body(
        &mut self,
        ctx: BodyCtx,
        opener: Option<(&str, Span)>,
    ) -> Result<Vec<Item>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();

            if self.is_at_end() {
                return match opener {
                    Some((what, span)) => {
                        Err(self.error(format!("missing `end` for {what}"), span))
                    }
                    None => Ok(items),
                };
            }

            if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::End)) {
                let end_tok = self.advance();
                return match opener {
                    Some(_) => {
                        // Tolerate trailing tokens such as `end.freeze`
                        if !self.at_terminator() {
                            self.skip_line();
                        }
                        Ok(items)
                    }
                    None => Err(self.error("unexpected `end`", end_tok.span)),
                };
            }

            self.parse_line(ctx, &mut items)?;
        }
    }

    /// Parse one logical line (possibly with a nested body) into `items`.
    fn parse_line(&mut self, ctx: BodyCtx, items: &mut Vec<Item>) -> Result<(), SyntaxError> {
        match self.peek_kind().clone() {
            TokenKind::Keyword(Keyword::Require) => {
                let item = self.parse_require()?;
                items.push(Item::Require(item));
            }
            TokenKind::Keyword(Keyword::Private) | TokenKind::Keyword(Keyword::Protected) => {
                let is_private = matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Private));
                self.advance();
                match self.peek_kind() {
                    TokenKind::Keyword(Keyword::Def) => {
                        let method = self.parse_def(is_private, false)?;
                        items.push(Item::Method(method));
                    }
                    TokenKind::Keyword(
                        Keyword::Class | Keyword::Module | Keyword::Struct | Keyword::Enum,
                    )
                    | TokenKind::Const(_) => {
                        // `private class X`, `private CONST = 1`
                        self.parse_line(ctx, items)?;
                    }
                    _ => {
                        self.finish_opaque_line(items)?;
                    }
                }
            }
            TokenKind::Keyword(Keyword::Abstract) => {
                self.advance();
                match self.peek_kind() {
                    TokenKind::Keyword(Keyword::Def) => {
                        let method = self.parse_def(false, true)?;
                        items.push(Item::Method(method));
                    }
                    TokenKind::Keyword(Keyword::Class | Keyword::Struct) => {
                        let keyword = match self.peek_kind() {
                            TokenKind::Keyword(Keyword::Class) => TypeKeyword::Class,
                            _ => TypeKeyword::Struct,
                        };
                        let def = self.parse_type(keyword, true)?;
                        items.push(Item::Type(def));
                    }
                    _ => {
                        self.finish_opaque_line(items)?;
                    }
                }
            }
            TokenKind::Keyword(Keyword::Class) => {
                let def = self.parse_type(TypeKeyword::Class, false)?;
                items.push(Item::Type(def));
            }
            TokenKind::Keyword(Keyword::Module) => {
                let def = self.parse_type(TypeKeyword::Module, false)?;
                items.push(Item::Type(def));
            }
            TokenKind::Keyword(Keyword::Struct) => {
                let def = self.parse_type(TypeKeyword::Struct, false)?;
                items.push(Item::Type(def));
            }
            TokenKind::Keyword(Keyword::Lib) => {
                let def = self.parse_type(TypeKeyword::Lib, false)?;
                items.push(Item::Type(def));
            }
            TokenKind::Keyword(Keyword::Enum) => {
                let def = self.parse_enum()?;
                items.push(Item::Enum(def));
            }
            TokenKind::Keyword(Keyword::Def) => {
                let method = self.parse_def(false, false)?;
                items.push(Item::Method(method));
            }
            TokenKind::Keyword(Keyword::Fun) => {
                let decl = self.parse_fun(ctx)?;
                items.push(Item::Fun(decl));
            }
            TokenKind::Keyword(Keyword::Alias) => {
                let decl = self.parse_alias()?;
                items.push(Item::Alias(decl));
            }
            TokenKind::Keyword(Keyword::Macro) => {
                let start = self.advance().span; // `macro`
                self.skip_line();
                // Macro bodies are template code; parse for balance only.
                self.parse_body(BodyCtx::Opaque, Some(("macro", start)))?;
            }
            TokenKind::Keyword(
                Keyword::If
                | Keyword::Unless
                | Keyword::While
                | Keyword::Until
                | Keyword::Case
                | Keyword::Begin,
            ) => {
                let start = self.peek().span;
                self.advance();
                let net = 1 + self.skip_line();
                if net > 0 {
                    let nested = self.parse_body(BodyCtx::Opaque, Some(("block", start)))?;
                    items.extend(nested);
                }
            }
            TokenKind::Keyword(
                Keyword::Else
                | Keyword::Elsif
                | Keyword::When
                | Keyword::In
                | Keyword::Rescue
                | Keyword::Ensure
                | Keyword::Then,
            ) => {
                // Continuation lines of an enclosing block
                self.finish_opaque_line(items)?;
            }
            TokenKind::Const(_) => {
                self.parse_const_line(ctx, items)?;
            }
            TokenKind::Ident(word) => {
                // `annotation Foo ... end` and `union Foo ... end` (inside
                // lib) are block declarations we track only for balance.
                if (word == "annotation" || word == "union")
                    && matches!(self.peek_at(1).kind, TokenKind::Const(_))
                {
                    let start = self.peek().span;
                    let net = self.skip_line();
                    if net >= 0 {
                        self.parse_body(BodyCtx::Opaque, Some(("block", start)))?;
                    }
                    return Ok(());
                }
                if let Some(kind) = AccessorKind::from_word(&word) {
                    if matches!(
                        self.peek_at(1).kind,
                        TokenKind::Ident(_) | TokenKind::Symbol(_)
                    ) {
                        let decl = self.parse_accessor(kind)?;
                        items.push(Item::Accessor(decl));
                        return Ok(());
                    }
                }
                if matches!(self.peek_at(1).kind, TokenKind::Eq) {
                    let (assign, opens) = self.parse_assign()?;
                    let opener_span = assign.name_span;
                    items.push(Item::Assign(assign));
                    if opens {
                        let nested =
                            self.parse_body(BodyCtx::Opaque, Some(("block", opener_span)))?;
                        items.extend(nested);
                    }
                    return Ok(());
                }
                self.finish_opaque_line(items)?;
            }
            TokenKind::InstanceVar(_) => {
                if matches!(self.peek_at(1).kind, TokenKind::Colon) {
                    let decl = self.parse_ivar_decl()?;
                    items.push(Item::InstanceVar(decl));
                } else {
                    self.finish_opaque_line(items)?;
                }
            }
            _ => {
                self.finish_opaque_line(items)?;
            }
        }
        Ok(())
    }

    /// Consume an opaque line; when it leaves a block open (trailing `do`),
    /// parse the nested body and splice its declarations.
    fn finish_opaque_line(&mut self, items: &mut Vec<Item>) -> Result<(), SyntaxError> {
        let start = self.peek().span;
        let net = self.skip_line();
        if net > 0 {
            let nested = self.parse_body(BodyCtx::Opaque, Some(("block", start)))?;
            items.extend(nested);
        }
        Ok(())
    }

    fn parse_require(&mut self) -> Result<RequireStmt, SyntaxError> {
        let start = self.advance().span; // `require`
        if !matches!(self.peek_kind(), TokenKind::Str) {
            let span = self.peek().span;
            return Err(self.error("expected a string after `require`", span));
        }
        let path_tok = self.advance();
        let raw = self.slice(path_tok.span.start, path_tok.span.end);
        let path = raw.trim_matches('"').to_string();
        self.skip_line();
        Ok(RequireStmt {
            path,
            span: start.to(&path_tok.span),
            path_span: path_tok.span,
        })
    }

    fn parse_type(
        &mut self,
        keyword: TypeKeyword,
        is_abstract: bool,
    ) -> Result<TypeDef, SyntaxError> {
        let start = self.advance().span; // keyword
        let (name, name_span) = self.parse_const_path()?;

        let superclass = if matches!(self.peek_kind(), TokenKind::Lt) {
            self.advance();
            let ty = self.capture_type();
            if ty.is_empty() { None } else { Some(ty) }
        } else {
            None
        };
        self.skip_line();

        let ctx = match keyword {
            TypeKeyword::Lib => BodyCtx::Lib,
            _ => BodyCtx::Type,
        };
        let body = self.parse_body(ctx, Some((keyword.as_str(), start)))?;

        Ok(TypeDef {
            keyword,
            name,
            superclass,
            is_abstract,
            body,
            span: start.to(&self.previous_span()),
            name_span,
        })
    }

    fn parse_enum(&mut self) -> Result<EnumDef, SyntaxError> {
        let start = self.advance().span; // `enum`
        let (name, name_span) = self.parse_const_path()?;
        let base = if matches!(self.peek_kind(), TokenKind::Colon) {
            self.advance();
            let ty = self.capture_type();
            if ty.is_empty() { None } else { Some(ty) }
        } else {
            None
        };
        self.skip_line();

        let mut body = self.parse_body(BodyCtx::Enum, Some(("enum", start)))?;
        let mut members = Vec::new();
        body.retain(|item| match item {
            Item::Constant(constant) if constant.value.is_empty() => {
                members.push(EnumMember {
                    name: constant.name.clone(),
                    span: constant.name_span,
                });
                false
            }
            _ => true,
        });

        Ok(EnumDef {
            name,
            base,
            members,
            body,
            span: start.to(&self.previous_span()),
            name_span,
        })
    }

    /// A line starting with a constant: an enum member, a constant
    /// assignment, or an opaque expression such as `Foo.bar`.
    fn parse_const_line(&mut self, ctx: BodyCtx, items: &mut Vec<Item>) -> Result<(), SyntaxError> {
        // Enum members: `Red`, `Red = 1`, `Red, Green`
        if ctx == BodyCtx::Enum
            && matches!(
                self.peek_at(1).kind,
                TokenKind::Newline | TokenKind::Eof | TokenKind::Eq | TokenKind::Comma
            )
        {
            loop {
                let tok = self.advance();
                let name = match tok.kind {
                    TokenKind::Const(name) => name,
                    _ => break,
                };
                items.push(Item::Constant(ConstantDef {
                    name,
                    value: String::new(),
                    span: tok.span,
                    name_span: tok.span,
                }));
                // Skip an optional `= value` up to a comma or end of line
                let mut depth = 0i32;
                loop {
                    match self.peek_kind() {
                        TokenKind::Newline | TokenKind::Eof => break,
                        TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                            depth += 1;
                            self.advance();
                        }
                        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                            depth -= 1;
                            self.advance();
                        }
                        TokenKind::Comma if depth == 0 => {
                            self.advance();
                            break;
                        }
                        _ => {
                            self.advance();
                        }
                    }
                }
                if !matches!(self.peek_kind(), TokenKind::Const(_)) {
                    break;
                }
            }
            if matches!(self.peek_kind(), TokenKind::Newline) {
                self.advance();
            }
            return Ok(());
        }

        // `CONST = value` (also `Foo::BAR = value`)
        let mut lookahead = 0;
        while matches!(self.peek_at(lookahead).kind, TokenKind::Const(_))
            && matches!(self.peek_at(lookahead + 1).kind, TokenKind::ColonColon)
        {
            lookahead += 2;
        }
        if matches!(self.peek_at(lookahead).kind, TokenKind::Const(_))
            && matches!(self.peek_at(lookahead + 1).kind, TokenKind::Eq)
        {
            let (name, name_span) = self.parse_const_path()?;
            self.advance(); // `=`
            let (value, net) = self.capture_line();
            let opens = net > 0 || Self::value_text_opens_block(&value);
            let span = name_span.to(&self.previous_span());
            items.push(Item::Constant(ConstantDef {
                name,
                value,
                span,
                name_span,
            }));
            if opens {
                let nested = self.parse_body(BodyCtx::Opaque, Some(("block", name_span)))?;
                items.extend(nested);
            }
            return Ok(());
        }

        self.finish_opaque_line(items)
    }

    /// Whether an assignment's captured value begins a multi-line
    /// `if`/`case`/`begin` expression.
    fn value_text_opens_block(value: &str) -> bool {
        let first = value.split_whitespace().next().unwrap_or("");
        matches!(first, "if" | "unless" | "case" | "begin")
    }

    /// Parse `name = value`. The second return value is true when the
    /// value expression keeps a block open past the line (`x = if cond`),
    /// which the caller must close with a nested body.
    fn parse_assign(&mut self) -> Result<(AssignStmt, bool), SyntaxError> {
        let name_tok = self.advance();
        let name = match name_tok.kind {
            TokenKind::Ident(name) => name,
            _ => return Err(self.error("expected an identifier", name_tok.span)),
        };
        self.advance(); // `=`
        let (value, net) = self.capture_line();
        let opens = net > 0 || Self::value_text_opens_block(&value);
        let assign = AssignStmt {
            name,
            value,
            span: name_tok.span.to(&self.previous_span()),
            name_span: name_tok.span,
        };
        Ok((assign, opens))
    }

    fn parse_ivar_decl(&mut self) -> Result<IvarDecl, SyntaxError> {
        let name_tok = self.advance();
        let name = match name_tok.kind {
            TokenKind::InstanceVar(name) => name,
            _ => return Err(self.error("expected an instance variable", name_tok.span)),
        };
        self.advance(); // `:`
        let type_name = self.capture_type();
        // Optional default: `@x : Int32 = 0`
        self.skip_line();
        Ok(IvarDecl {
            name,
            type_name,
            span: name_tok.span.to(&self.previous_span()),
            name_span: name_tok.span,
        })
    }

    fn parse_alias(&mut self) -> Result<AliasDef, SyntaxError> {
        let start = self.advance().span; // `alias`
        let (name, name_span) = self.parse_const_path()?;
        if !matches!(self.peek_kind(), TokenKind::Eq) {
            let span = self.peek().span;
            return Err(self.error("expected `=` in alias", span));
        }
        self.advance();
        let (target, _) = self.capture_line();
        Ok(AliasDef {
            name,
            target,
            span: start.to(&self.previous_span()),
            name_span,
        })
    }

    fn parse_accessor(&mut self, kind: AccessorKind) -> Result<AccessorDecl, SyntaxError> {
        let start = self.advance().span; // `property` / `getter` / `setter`
        let mut names = Vec::new();

        loop {
            let (name, name_span) = match self.peek_kind().clone() {
                TokenKind::Ident(name) => {
                    let tok = self.advance();
                    (name, tok.span)
                }
                TokenKind::Symbol(name) => {
                    let tok = self.advance();
                    (name, tok.span)
                }
                _ => break,
            };

            let type_name = if matches!(self.peek_kind(), TokenKind::Colon) {
                self.advance();
                let ty = self.capture_type();
                if ty.is_empty() { None } else { Some(ty) }
            } else {
                None
            };

            // Skip a default value up to the next top-level comma
            if matches!(self.peek_kind(), TokenKind::Eq) {
                self.advance();
                let mut depth = 0i32;
                loop {
                    match self.peek_kind() {
                        TokenKind::Newline | TokenKind::Eof => break,
                        TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                            depth += 1;
                            self.advance();
                        }
                        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                            depth -= 1;
                            self.advance();
                        }
                        TokenKind::Comma if depth == 0 => break,
                        _ => {
                            self.advance();
                        }
                    }
                }
            }

            names.push(AccessorName {
                name,
                type_name,
                name_span,
            });

            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.skip_line();
        Ok(AccessorDecl {
            kind,
            names,
            span: start.to(&self.previous_span()),
        })
    }

    fn parse_fun(&mut self, ctx: BodyCtx) -> Result<FunDecl, SyntaxError> {
        let start = self.advance().span; // `fun`
        let name_tok = self.advance();
        let name = match name_tok.kind {
            TokenKind::Ident(name) => name,
            TokenKind::Const(name) => name,
            _ => return Err(self.error("expected a name after `fun`", name_tok.span)),
        };

        let c_name = if matches!(self.peek_kind(), TokenKind::Eq) {
            self.advance();
            match self.peek_kind().clone() {
                TokenKind::Ident(name) | TokenKind::Const(name) => {
                    self.advance();
                    Some(name)
                }
                TokenKind::Str => {
                    let tok = self.advance();
                    Some(
                        self.slice(tok.span.start, tok.span.end)
                            .trim_matches('"')
                            .to_string(),
                    )
                }
                _ => None,
            }
        } else {
            None
        };

        let params_src = if matches!(self.peek_kind(), TokenKind::LParen) {
            self.capture_parenthesized()?
        } else {
            String::new()
        };

        let return_type = if matches!(self.peek_kind(), TokenKind::Colon) {
            self.advance();
            let ty = self.capture_type();
            if ty.is_empty() { None } else { Some(ty) }
        } else {
            None
        };
        self.skip_line();

        if ctx != BodyCtx::Lib {
            // Top-level fun definitions carry a body
            self.parse_body(BodyCtx::Opaque, Some(("fun", start)))?;
        }

        Ok(FunDecl {
            name,
            c_name,
            params_src,
            return_type,
            span: start.to(&self.previous_span()),
            name_span: name_tok.span,
        })
    }

    fn parse_def(&mut self, is_private: bool, is_abstract: bool) -> Result<MethodDef, SyntaxError> {
        let start = self.advance().span; // `def`

        // Optional receiver: `def self.name` or `def Type.name`. After
        // `def` the lexer treats keywords as names, so `self` arrives as
        // an identifier here.
        let mut receiver = None;
        match self.peek_kind().clone() {
            TokenKind::Ident(name)
                if name == "self" && matches!(self.peek_at(1).kind, TokenKind::Dot) =>
            {
                self.advance();
                self.advance();
                receiver = Some(name);
            }
            TokenKind::Const(name) if matches!(self.peek_at(1).kind, TokenKind::Dot) => {
                self.advance();
                self.advance();
                receiver = Some(name);
            }
            _ => {}
        }

        // Method name: identifier or an operator spelling such as `[]=`,
        // `==`, `<=>`, `+`.
        let name_start = self.peek().span;
        let mut name = String::new();
        let mut name_span = name_start;
        match self.peek_kind().clone() {
            TokenKind::Ident(word) => {
                let tok = self.advance();
                name = word;
                name_span = tok.span;
                // Setter: `def name=(value)`
                if matches!(self.peek_kind(), TokenKind::Eq)
                    && matches!(self.peek_at(1).kind, TokenKind::LParen)
                {
                    let eq = self.advance();
                    name.push('=');
                    name_span = name_span.to(&eq.span);
                }
            }
            _ => {
                // Operator method: `==`, `<=>`, `+`, `[]`, `[]=`, ...
                while matches!(
                    self.peek_kind(),
                    TokenKind::Op(_)
                        | TokenKind::Lt
                        | TokenKind::Pipe
                        | TokenKind::LBracket
                        | TokenKind::RBracket
                        | TokenKind::Eq
                ) {
                    let tok = self.advance();
                    name_span = if name.is_empty() {
                        tok.span
                    } else {
                        name_span.to(&tok.span)
                    };
                    name.push_str(self.slice(tok.span.start, tok.span.end));
                }
                if name.is_empty() {
                    return Err(self.error("expected a method name", name_start));
                }
            }
        }

        let params_src = if matches!(self.peek_kind(), TokenKind::LParen) {
            self.capture_parenthesized()?
        } else {
            String::new()
        };
        let params = Self::parse_params(&params_src);

        let return_type = if matches!(self.peek_kind(), TokenKind::Colon) {
            self.advance();
            let ty = self.capture_type();
            if ty.is_empty() { None } else { Some(ty) }
        } else {
            None
        };

        // Short form: `def foo = expr` has no body.
        let short_form = matches!(self.peek_kind(), TokenKind::Eq);
        self.skip_line();

        let body = if is_abstract || short_form {
            Vec::new()
        } else {
            self.parse_body(BodyCtx::Method, Some(("def", start)))?
        };

        Ok(MethodDef {
            name,
            receiver,
            params,
            params_src,
            return_type,
            is_private,
            is_abstract,
            body,
            span: start.to(&self.previous_span()),
            name_span,
        })
    }

    /// Split a raw parameter list on top-level commas and pull out names
    /// and declared types.
    fn parse_params(params_src: &str) -> Vec<Param> {
        let mut params = Vec::new();
        if params_src.trim().is_empty() {
            return params;
        }

        let mut depth = 0i32;
        let mut piece = String::new();
        let mut pieces = Vec::new();
        for ch in params_src.chars() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                ',' if depth == 0 => {
                    pieces.push(std::mem::take(&mut piece));
                    continue;
                }
                _ => {}
            }
            piece.push(ch);
        }
        if !piece.trim().is_empty() {
            pieces.push(piece);
        }

        for piece in pieces {
            let piece = piece.trim();
            let (names_part, type_part) = match piece.split_once(':') {
                Some((n, t)) => (n.trim(), Some(t)),
                None => (piece, None),
            };
            let name = names_part
                .split_whitespace()
                .last()
                .unwrap_or("")
                .trim_start_matches(['*', '&'])
                .to_string();
            if name.is_empty() {
                continue;
            }
            let type_name = type_part.map(|t| {
                let t = t.split('=').next().unwrap_or(t);
                t.trim().to_string()
            });
            params.push(Param { name, type_name });
        }
        params
    }
}

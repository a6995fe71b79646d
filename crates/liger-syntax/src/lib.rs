//! Crystal syntax frontend for the Liger language server.
//!
//! This crate provides a tokenizer and an outline parser that recover the
//! declaration structure of a Crystal source file: types, methods,
//! accessors, constants, and assignments, with balanced `end` matching.
//! It is deliberately not a full expression parser; expression-level code
//! is scanned for block structure only.

mod ast;
mod lexer;
mod parser;
mod span;
mod token;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::Parser;
pub use span::Span;
pub use token::{Keyword, Token, TokenKind};

use thiserror::Error;

/// A syntax error with a 1-based line/column position.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// 1-based line of the error.
    pub fn line(&self) -> u32 {
        self.span.line
    }

    /// 1-based column of the error.
    pub fn column(&self) -> u32 {
        self.span.column
    }
}

/// Parse source code into a declaration-level AST.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(source, tokens);
    parser.parse_program()
}

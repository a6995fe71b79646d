//! Error and diagnostic types for the Liger language server.

use thiserror::Error;

use crate::Range;

/// JSON-RPC error codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
    ServerNotInitialized = -32002,
    RequestCancelled = -32800,
    ContentModified = -32801,
}

impl ErrorCode {
    /// The numeric code sent in an error response.
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// The main error type for server operations.
#[derive(Debug, Error)]
pub enum LigerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in message body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed frame: {message}")]
    MalformedFrame { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("method not found: {method}")]
    MethodNotFound { method: String },

    #[error("invalid params for {method}: {message}")]
    InvalidParams { method: String, message: String },

    #[error("server not initialized")]
    NotInitialized,

    #[error("request cancelled")]
    RequestCancelled,

    #[error("content modified")]
    ContentModified,

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl LigerError {
    /// Shorthand for an internal error with a formatted message.
    pub fn internal(message: impl Into<String>) -> Self {
        LigerError::Internal {
            message: message.into(),
        }
    }

    /// Map this error to the JSON-RPC code it should be reported with.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            LigerError::Json(_) | LigerError::MalformedFrame { .. } => ErrorCode::ParseError,
            LigerError::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            LigerError::MethodNotFound { .. } => ErrorCode::MethodNotFound,
            LigerError::InvalidParams { .. } => ErrorCode::InvalidParams,
            LigerError::NotInitialized => ErrorCode::ServerNotInitialized,
            LigerError::RequestCancelled => ErrorCode::RequestCancelled,
            LigerError::ContentModified => ErrorCode::ContentModified,
            LigerError::Io(_) | LigerError::Internal { .. } => ErrorCode::InternalError,
        }
    }
}

/// Result type alias for server operations.
pub type LigerResult<T> = Result<T, LigerError>;

/// Severity of a published diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// A diagnostic message attached to a range in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: Range,
    pub message: String,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, range: Range) -> Self {
        Self {
            severity: Severity::Error,
            range,
            message: message.into(),
            source: None,
        }
    }

    pub fn warning(message: impl Into<String>, range: Range) -> Self {
        Self {
            severity: Severity::Warning,
            range,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// A single-character-wide error at the given 0-based line/character.
    pub fn point_error(message: impl Into<String>, line: u32, character: u32) -> Self {
        Self::error(
            message,
            Range::on_line(line, character, character.saturating_add(1)),
        )
    }
}

/// A collection of diagnostics for one document.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, range: Range) {
        self.push(Diagnostic::error(message, range));
    }

    pub fn warning(&mut self, message: impl Into<String>, range: Range) {
        self.push(Diagnostic::warning(message, range));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(diagnostic);
        diagnostics
    }
}

//! Diagnostic error type for seed document processing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// Closed set of diagnostic kinds a seed document can fail with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    Syntax,
    ReadError,
    InvalidStructure,
    NoDataSections,
    InvalidConfig,
    InvalidStrategy,
    CreationFailed,
    MethodNotFound,
    InvalidMethodName,
    MissingTemplate,
    MissingCount,
    TemplateExpressionError,
    ExpressionEvaluationError,
    ReferenceNotFound,
    AttributeNotFound,
    RegistryKeyNotFound,
    InvalidDateKey,
    SuiteNotFound,
    Unexpected,
}

/// Document-level diagnostic: what went wrong, where, and how to fix it.
///
/// Immutable once built. Nothing but `ParseError` escapes the orchestrator;
/// callers render `message`, `suggestions`, and the location fields, never an
/// internal fault.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub source_id: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub suggestions: Vec<String>,
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source_id: None,
            line: None,
            column: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    /// Attach source/line information without clobbering values already set
    /// closer to the failure site.
    pub fn fill_location(mut self, source_id: &str, line: Option<usize>) -> Self {
        if self.source_id.is_none() {
            self.source_id = Some(source_id.to_string());
        }
        if self.line.is_none() {
            self.line = line;
        }
        self
    }
}

//! Error handling for the Quartz C compiler
//!
//! This module defines the compiler-wide error type and the diagnostic
//! reporter used throughout the compiler. Phase-local error enums (type
//! errors, constant-evaluation errors) convert into `CompilerError` at
//! the crate boundary.

use crate::source_loc::{SourceLocation, SourceSpan};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main compiler error type that encompasses all phases of compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("type error at {location}: {message}")]
    TypeError {
        location: SourceLocation,
        message: String,
    },

    #[error("constant expression error at {location}: {message}")]
    ConstError {
        location: SourceLocation,
        message: String,
    },

    #[error("semantic error at {location}: {message}")]
    SemanticError {
        location: SourceLocation,
        message: String,
    },

    #[error("I/O error: {message}")]
    IoError { message: String },

    #[error("internal compiler error: {message}")]
    InternalError { message: String },
}

impl CompilerError {
    /// Create a type error
    pub fn type_error(message: String, location: SourceLocation) -> Self {
        CompilerError::TypeError { location, message }
    }

    /// Create a constant-expression error
    pub fn const_error(message: String, location: SourceLocation) -> Self {
        CompilerError::ConstError { location, message }
    }

    /// Create a semantic error
    pub fn semantic_error(message: String, location: SourceLocation) -> Self {
        CompilerError::SemanticError { location, message }
    }

    /// Create an internal error
    pub fn internal(message: String) -> Self {
        CompilerError::InternalError { message }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError {
            message: err.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with location and severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: SourceSpan,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: String, span: SourceSpan) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
        }
    }

    pub fn warning(message: String, span: SourceSpan) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.span, self.severity, self.message)?;

        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }

        Ok(())
    }
}

/// Error reporter for collecting and displaying diagnostics
///
/// Errors are fatal per translation unit but do not abort the process;
/// the reporter accumulates everything so a single run can surface
/// multiple errors.
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
        }
    }

    /// Report an error diagnostic
    pub fn error(&mut self, message: String, span: SourceSpan) -> &mut Diagnostic {
        let diagnostic = Diagnostic::error(message, span);
        self.diagnostics.push(diagnostic);
        self.error_count += 1;
        self.diagnostics.last_mut().unwrap()
    }

    /// Report a warning diagnostic
    pub fn warning(&mut self, message: String, span: SourceSpan) -> &mut Diagnostic {
        let diagnostic = Diagnostic::warning(message, span);
        self.diagnostics.push(diagnostic);
        self.warning_count += 1;
        self.diagnostics.last_mut().unwrap()
    }

    /// Report a compiler error as a diagnostic at its own location
    pub fn report(&mut self, err: &CompilerError) {
        let (message, span) = match err {
            CompilerError::TypeError { location, message }
            | CompilerError::ConstError { location, message }
            | CompilerError::SemanticError { location, message } => (
                message.clone(),
                SourceSpan::at(location.clone()),
            ),
            CompilerError::IoError { message } | CompilerError::InternalError { message } => {
                (message.clone(), SourceSpan::unknown())
            }
        };
        self.error(message, span);
    }

    /// Check if any errors have been reported
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Get the number of errors
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Get the number of warnings
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Get all diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr
    pub fn print_diagnostics(&self) {
        for diagnostic in &self.diagnostics {
            eprintln!("{}", diagnostic);
        }
    }

    /// Create a summary string
    pub fn summary(&self) -> String {
        match (self.error_count, self.warning_count) {
            (0, 0) => "No errors or warnings".to_string(),
            (0, w) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (e, 0) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (e, w) => format!(
                "{} error{} and {} warning{}",
                e,
                if e == 1 { "" } else { "s" },
                w,
                if w == 1 { "" } else { "s" }
            ),
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

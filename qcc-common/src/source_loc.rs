//! Source positions for diagnostics
//!
//! Everything the compiler reports is anchored to a position in the
//! preprocessed input: a file name plus 1-based line and column. Spans
//! pair two positions so multi-token constructs print as a range.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in a source file. Line and column are 1-based; 0 marks a
/// position that is not tied to real input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub filename: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(filename: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
            column,
        }
    }

    /// A position for entities with no place in the input (compiler
    /// built-ins, synthesized nodes, tests)
    pub fn unknown() -> Self {
        Self::new("<unknown>", 0, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

/// The region of source text an AST node or diagnostic covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }

    /// A zero-width span at a single position
    pub fn at(location: SourceLocation) -> Self {
        Self {
            end: location.clone(),
            start: location,
        }
    }

    /// A span for synthesized constructs and tests
    pub fn unknown() -> Self {
        Self::at(SourceLocation::unknown())
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)?;
        if self.end == self.start {
            Ok(())
        } else if self.end.filename != self.start.filename {
            write!(f, " to {}", self.end)
        } else if self.end.line == self.start.line {
            write!(f, "-{}", self.end.column)
        } else {
            write!(f, "-{}:{}", self.end.line, self.end.column)
        }
    }
}

/// Implemented by nodes that remember where they came from
pub trait HasSpan {
    fn span(&self) -> SourceSpan;

    /// The position diagnostics anchor to
    fn location(&self) -> SourceLocation {
        self.span().start
    }
}

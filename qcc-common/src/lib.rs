//! Quartz C Compiler - Common Types and Utilities
//!
//! This crate contains source-location tracking, diagnostics, and the
//! compiler-wide error type shared by all components of the Quartz C
//! compiler.

pub mod error;
pub mod source_loc;

pub use error::{CompilerError, Diagnostic, ErrorReporter, Severity};
pub use source_loc::{HasSpan, SourceLocation, SourceSpan};

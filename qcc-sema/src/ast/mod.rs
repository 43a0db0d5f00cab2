//! Typed abstract syntax tree
//!
//! The closed sets of expression and statement variants the parser
//! builds and the code generator consumes. Every expression carries its
//! semantic type (after type checking and materialized conversions), a
//! value category, and a source span.

pub mod expressions;
pub mod ops;
pub mod statements;

pub use expressions::{Constant, Expression, ExpressionKind, Object, ValueCategory};
pub use ops::{BinaryOp, UnaryOp};
pub use statements::{
    Declaration, ExternalDecl, FuncDef, Initializer, Statement, StatementKind, TranslationUnit,
};

/// Label identifier for lowered control flow
pub type LabelId = u32;

/// Temporary variable identifier
pub type TempId = u32;

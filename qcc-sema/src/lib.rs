//! Quartz C Compiler - Semantic Core
//!
//! This crate implements the semantic heart of the Quartz C compiler:
//! - Type registry: all C type values, interning, widths, compatibility
//! - Symbol and scope model: nested lexical scopes for identifiers
//! - Typed AST: expression and statement nodes produced by the parser
//! - Visitor dispatch: uniform traversal over the closed AST sets
//! - Constant evaluator: compile-time folding for initializers, case
//!   labels, enumerator values, and static storage
//!
//! The preprocessor, parser, and code generator are external phases; the
//! token stream they exchange and the evaluator/label entry points the
//! code generator consumes are defined here.

pub mod ast;
pub mod context;
pub mod eval;
pub mod scope;
pub mod strings;
pub mod token;
pub mod types;
pub mod visitor;

pub use ast::{
    BinaryOp, Constant, Declaration, Expression, ExpressionKind, ExternalDecl, FuncDef,
    Initializer, Object, Statement, StatementKind, TranslationUnit, UnaryOp, ValueCategory,
};
pub use context::{CompileOptions, Context};
pub use eval::{constant_label, object_label, Address, EvalError, Evaluator, FloatKind, IntKind};
pub use scope::{Linkage, ScopeStack, StorageClass, Symbol, SymbolId};
pub use strings::{LabelGenerator, StringPool};
pub use token::{Token, TokenKind};
pub use types::{ArithKind, Qualifiers, TypeError, TypeKind, TypeRef, TypeRegistry};

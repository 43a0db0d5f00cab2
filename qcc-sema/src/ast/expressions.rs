//! Expression AST nodes
//!
//! Expressions are built by the parser with their semantic type already
//! attached; implicit conversions show up as explicit cast nodes, so
//! downstream consumers (the constant evaluator, the code generator)
//! never re-derive them.

use super::ops::{BinaryOp, UnaryOp};
use super::TempId;
use crate::scope::{Linkage, StorageClass, SymbolId};
use crate::types::TypeRef;
use qcc_common::{HasSpan, SourceSpan};
use serde::{Deserialize, Serialize};

/// Value category of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueCategory {
    /// Refers to storage
    Lvalue,
    /// Pure value
    Rvalue,
}

/// A typed expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub ty: TypeRef,
    pub category: ValueCategory,
    pub span: SourceSpan,
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: TypeRef, category: ValueCategory, span: SourceSpan) -> Self {
        Self {
            kind,
            ty,
            category,
            span,
        }
    }

    pub fn is_lvalue(&self) -> bool {
        self.category == ValueCategory::Lvalue
    }
}

impl HasSpan for Expression {
    fn span(&self) -> SourceSpan {
        self.span.clone()
    }
}

/// The closed set of expression variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// Literal constant
    Constant(Constant),

    /// A name that is not an object: function designators and other
    /// identifiers resolved against the symbol table
    Identifier {
        name: String,
        symbol: Option<SymbolId>,
    },

    /// Named storage
    Object(Object),

    /// Enumeration constant
    Enumerator { name: String, value: i64 },

    /// Compiler-introduced temporary
    TempVar { id: TempId },

    /// Binary operation; for `BinaryOp::Member` the right operand is
    /// the member object of the aggregate on the left
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },

    /// Unary operation; for `UnaryOp::Cast` the target type is the
    /// node's own type
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },

    /// Ternary conditional
    Conditional {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Box<Expression>,
    },

    /// Function call
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
}

/// Literal constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// Integer or character literal (value held sign-extended)
    Int(i64),
    /// Floating literal
    Float(f64),
    /// String literal, interned in the translation unit's string pool
    Str { value: String, pool_id: u32 },
}

/// A named object (storage)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub symbol: Option<SymbolId>,
    pub storage_class: StorageClass,
    pub linkage: Linkage,
    /// Emitted label when it differs from the name (block-scope
    /// statics get a mangled label)
    pub label: Option<String>,
}

impl Object {
    pub fn new(name: String, storage_class: StorageClass, linkage: Linkage) -> Self {
        Self {
            name,
            symbol: None,
            storage_class,
            linkage,
            label: None,
        }
    }

    /// Whether the object lives in static storage (and therefore has an
    /// address that is a link-time constant)
    pub fn is_statically_allocated(&self) -> bool {
        self.storage_class == StorageClass::Static
            || self.storage_class == StorageClass::Extern
            || self.linkage != Linkage::None
    }
}

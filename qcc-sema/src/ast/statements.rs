//! Statement AST nodes
//!
//! The parser lowers all control flow (loops, switch) into conditional
//! jumps and labels, so the statement set stays small and the code
//! generator never sees structured loops.

use super::expressions::Expression;
use super::LabelId;
use crate::types::TypeRef;
use qcc_common::SourceSpan;
use serde::{Deserialize, Serialize};

/// One initialization of a slice of an object, at a byte offset
///
/// Scalar initializers have offset 0; aggregate initializer lists are
/// flattened into one entry per initialized element or member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    pub offset: u64,
    pub ty: TypeRef,
    pub expr: Expression,
}

/// A declaration with its flattened initializers; the declared entity
/// is an `ExpressionKind::Object` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub object: Expression,
    pub initializers: Vec<Initializer>,
    pub span: SourceSpan,
}

/// A typed statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: SourceSpan,
}

/// The closed set of statement variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    Declaration(Declaration),

    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },

    /// Unconditional jump to a label
    Jump { target: LabelId },

    Return { value: Option<Expression> },

    Label { id: LabelId },

    Empty,

    Compound { statements: Vec<Statement> },

    /// Expression evaluated for its effects
    Expr(Expression),
}

/// A function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    pub name: String,
    pub ty: TypeRef,
    pub params: Vec<Expression>,
    pub body: Statement,
    pub span: SourceSpan,
}

/// A top-level item of a translation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExternalDecl {
    Function(FuncDef),
    Declaration(Declaration),
}

/// One preprocessed source file presented to the compiler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub items: Vec<ExternalDecl>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expressions::{Constant, ExpressionKind, ValueCategory};

    #[test]
    fn test_statement_construction() {
        let expr = Expression::new(
            ExpressionKind::Constant(Constant::Int(1)),
            1,
            ValueCategory::Rvalue,
            SourceSpan::unknown(),
        );
        let stmt = Statement {
            kind: StatementKind::Return {
                value: Some(expr),
            },
            span: SourceSpan::unknown(),
        };

        match stmt.kind {
            StatementKind::Return { value: Some(e) } => {
                assert!(matches!(e.kind, ExpressionKind::Constant(Constant::Int(1))))
            }
            _ => panic!("Expected return statement"),
        }
    }
}

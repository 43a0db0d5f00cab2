//! Uniform traversal over the closed AST sets
//!
//! Consumers (the code generator, analyses) implement `Visit` and
//! override the hooks they care about; the `walk_*` functions recurse
//! into children in left-to-right order. The constant evaluator does
//! not use this trait: it pattern-matches directly because it computes
//! values rather than performing effects.

use crate::ast::{
    Declaration, Expression, ExpressionKind, ExternalDecl, FuncDef, Statement, StatementKind,
    TranslationUnit,
};

/// AST visitor with default traversal
pub trait Visit {
    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr);
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }

    fn visit_declaration(&mut self, decl: &Declaration) {
        walk_declaration(self, decl);
    }

    fn visit_function(&mut self, func: &FuncDef) {
        walk_function(self, func);
    }

    fn visit_translation_unit(&mut self, unit: &TranslationUnit) {
        walk_translation_unit(self, unit);
    }
}

pub fn walk_expression<V: Visit + ?Sized>(visitor: &mut V, expr: &Expression) {
    match &expr.kind {
        ExpressionKind::Constant(_)
        | ExpressionKind::Identifier { .. }
        | ExpressionKind::Object(_)
        | ExpressionKind::Enumerator { .. }
        | ExpressionKind::TempVar { .. } => {}
        ExpressionKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expression(lhs);
            visitor.visit_expression(rhs);
        }
        ExpressionKind::Unary { operand, .. } => {
            visitor.visit_expression(operand);
        }
        ExpressionKind::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            visitor.visit_expression(condition);
            visitor.visit_expression(then_expr);
            visitor.visit_expression(else_expr);
        }
        ExpressionKind::Call { callee, arguments } => {
            visitor.visit_expression(callee);
            for arg in arguments {
                visitor.visit_expression(arg);
            }
        }
    }
}

pub fn walk_statement<V: Visit + ?Sized>(visitor: &mut V, stmt: &Statement) {
    match &stmt.kind {
        StatementKind::Declaration(decl) => visitor.visit_declaration(decl),
        StatementKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expression(condition);
            visitor.visit_statement(then_branch);
            if let Some(else_branch) = else_branch {
                visitor.visit_statement(else_branch);
            }
        }
        StatementKind::Jump { .. } | StatementKind::Label { .. } | StatementKind::Empty => {}
        StatementKind::Return { value } => {
            if let Some(value) = value {
                visitor.visit_expression(value);
            }
        }
        StatementKind::Compound { statements } => {
            for stmt in statements {
                visitor.visit_statement(stmt);
            }
        }
        StatementKind::Expr(expr) => visitor.visit_expression(expr),
    }
}

pub fn walk_declaration<V: Visit + ?Sized>(visitor: &mut V, decl: &Declaration) {
    visitor.visit_expression(&decl.object);
    for init in &decl.initializers {
        visitor.visit_expression(&init.expr);
    }
}

pub fn walk_function<V: Visit + ?Sized>(visitor: &mut V, func: &FuncDef) {
    for param in &func.params {
        visitor.visit_expression(param);
    }
    visitor.visit_statement(&func.body);
}

pub fn walk_translation_unit<V: Visit + ?Sized>(visitor: &mut V, unit: &TranslationUnit) {
    for item in &unit.items {
        match item {
            ExternalDecl::Function(func) => visitor.visit_function(func),
            ExternalDecl::Declaration(decl) => visitor.visit_declaration(decl),
        }
    }
}

//! Constant expression evaluation
//!
//! Folds expression trees at translation time: initializers of static
//! storage, case labels, enumerator values, and array bounds. The
//! evaluator is one function family over runtime-tagged values, with
//! narrowing applied at the leaves; signed overflow wraps two's
//! complement at the target width.
//!
//! Address constants (`&var`, `arr + k`, `&s.field`, string literals)
//! fold to a `(label, offset)` pair the code generator can emit as a
//! relocation.

use crate::ast::{BinaryOp, Constant, Expression, ExpressionKind, Object, UnaryOp};
use crate::strings::StringPool;
use crate::types::{ArithKind, TypeRegistry};
use qcc_common::{CompilerError, HasSpan, SourceLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An address constant: a symbolic label plus a byte offset. A missing
/// label with a nonzero offset is an absolute integer address
/// (cast-to-pointer); a present label is link-time relocatable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub label: Option<String>,
    pub offset: i64,
}

impl Address {
    pub fn absolute(offset: i64) -> Self {
        Self {
            label: None,
            offset,
        }
    }

    pub fn symbolic(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            offset: 0,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) if self.offset != 0 => write!(f, "{}{:+}", label, self.offset),
            Some(label) => write!(f, "{}", label),
            None => write!(f, "{}", self.offset),
        }
    }
}

/// Errors raised during constant folding
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("{location}: expected a constant expression")]
    NotConstant { location: SourceLocation },

    #[error("{location}: division by zero in constant expression")]
    DivisionByZero { location: SourceLocation },

    #[error("{location}: shift amount {amount} out of range for {width}-bit operand")]
    ShiftOutOfRange {
        amount: i64,
        width: u32,
        location: SourceLocation,
    },

    #[error("{location}: value {value} cannot be represented in `{target}`")]
    ValueOutOfRange {
        value: f64,
        target: String,
        location: SourceLocation,
    },
}

impl From<EvalError> for CompilerError {
    fn from(err: EvalError) -> Self {
        let location = match &err {
            EvalError::NotConstant { location }
            | EvalError::DivisionByZero { location }
            | EvalError::ShiftOutOfRange { location, .. }
            | EvalError::ValueOutOfRange { location, .. } => location.clone(),
        };
        CompilerError::const_error(err.to_string(), location)
    }
}

fn not_constant(expr: &Expression) -> EvalError {
    EvalError::NotConstant {
        location: expr.location(),
    }
}

/// Integer target kinds for folding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

impl IntKind {
    pub fn width_bits(self) -> u32 {
        match self {
            IntKind::I8 | IntKind::U8 => 8,
            IntKind::I16 | IntKind::U16 => 16,
            IntKind::I32 | IntKind::U32 => 32,
            IntKind::I64 | IntKind::U64 => 64,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64)
    }

    /// The folding kind of an integer arithmetic kind
    pub fn of(kind: ArithKind) -> Option<IntKind> {
        match kind {
            ArithKind::Bool | ArithKind::UChar => Some(IntKind::U8),
            ArithKind::Char | ArithKind::SChar => Some(IntKind::I8),
            ArithKind::Short => Some(IntKind::I16),
            ArithKind::UShort => Some(IntKind::U16),
            ArithKind::Int => Some(IntKind::I32),
            ArithKind::UInt => Some(IntKind::U32),
            ArithKind::Long | ArithKind::LongLong => Some(IntKind::I64),
            ArithKind::ULong | ArithKind::ULongLong => Some(IntKind::U64),
            _ => None,
        }
    }
}

impl fmt::Display for IntKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntKind::I8 => "i8",
            IntKind::U8 => "u8",
            IntKind::I16 => "i16",
            IntKind::U16 => "u16",
            IntKind::I32 => "i32",
            IntKind::U32 => "u32",
            IntKind::I64 => "i64",
            IntKind::U64 => "u64",
        };
        write!(f, "{}", name)
    }
}

/// Floating target kinds for folding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatKind {
    F32,
    F64,
}

impl FloatKind {
    pub fn of(kind: ArithKind) -> Option<FloatKind> {
        match kind {
            ArithKind::Float => Some(FloatKind::F32),
            ArithKind::Double => Some(FloatKind::F64),
            _ => None,
        }
    }
}

/// A folded value, tagged with the kind it was computed in
#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    /// Signed kinds are held sign-extended, unsigned kinds
    /// zero-extended (the `u64` payload reinterpreted)
    Int { kind: IntKind, v: i64 },
    Float { kind: FloatKind, v: f64 },
}

/// Wrap an exact result to the target width and renormalize
fn wrap(kind: IntKind, x: i128) -> i64 {
    let bits = kind.width_bits();
    let masked = (x as u128) & (u128::MAX >> (128 - bits));
    if kind.is_signed() {
        let shift = 128 - bits;
        (((masked << shift) as i128) >> shift) as i64
    } else {
        masked as u64 as i64
    }
}

/// Widen a normalized value to its exact mathematical value
fn widen(kind: IntKind, v: i64) -> i128 {
    if kind.is_signed() {
        v as i128
    } else {
        (v as u64) as i128
    }
}

/// The symbolic label the code generator emits for a static object
pub fn object_label(object: &Object) -> String {
    object
        .label
        .clone()
        .unwrap_or_else(|| object.name.clone())
}

/// The pool label for a string-literal constant
pub fn constant_label(constant: &Constant) -> Option<String> {
    match constant {
        Constant::Str { pool_id, .. } => Some(StringPool::label(*pool_id)),
        _ => None,
    }
}

/// Compile-time expression folder for one translation unit
pub struct Evaluator<'a> {
    types: &'a TypeRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(types: &'a TypeRegistry) -> Self {
        Self { types }
    }

    /// Fold an integer constant expression into the given target kind
    pub fn eval_int_kind(&self, expr: &Expression, kind: IntKind) -> Result<i64, EvalError> {
        let value = self.arith(expr)?;
        self.value_to_int(value, kind, expr)
    }

    /// Fold an integer constant expression in the kind of its own type
    pub fn eval_int(&self, expr: &Expression) -> Result<i64, EvalError> {
        let kind = self
            .types
            .arith_kind(expr.ty)
            .and_then(IntKind::of)
            .ok_or_else(|| not_constant(expr))?;
        self.eval_int_kind(expr, kind)
    }

    /// Fold a floating constant expression into the given target kind
    pub fn eval_float_kind(&self, expr: &Expression, kind: FloatKind) -> Result<f64, EvalError> {
        let v = match self.arith(expr)? {
            Value::Int { kind: ik, v } => widen(ik, v) as f64,
            Value::Float { v, .. } => v,
        };
        Ok(match kind {
            FloatKind::F32 => (v as f32) as f64,
            FloatKind::F64 => v,
        })
    }

    pub fn eval_float(&self, expr: &Expression) -> Result<f64, EvalError> {
        self.eval_float_kind(expr, FloatKind::F64)
    }

    /// Fold an address-constant expression into `(label, offset)`
    pub fn eval_addr(&self, expr: &Expression) -> Result<Address, EvalError> {
        let addr = self.addr(expr)?;
        log::trace!("folded address constant: {}", addr);
        Ok(addr)
    }

    fn addr(&self, expr: &Expression) -> Result<Address, EvalError> {
        match &expr.kind {
            ExpressionKind::Identifier { name, .. } => Ok(Address::symbolic(name.clone())),

            ExpressionKind::Object(object) => {
                if object.is_statically_allocated() {
                    Ok(Address::symbolic(object_label(object)))
                } else {
                    Err(not_constant(expr))
                }
            }

            ExpressionKind::Constant(Constant::Int(v)) => Ok(Address::absolute(*v)),
            ExpressionKind::Constant(Constant::Str { pool_id, .. }) => {
                Ok(Address::symbolic(StringPool::label(*pool_id)))
            }
            ExpressionKind::Constant(Constant::Float(_)) => Err(not_constant(expr)),

            ExpressionKind::Enumerator { value, .. } => Ok(Address::absolute(*value)),

            ExpressionKind::Unary { op, operand } => match op {
                // The address of `*p` is `p`; casts are transparent
                UnaryOp::AddressOf | UnaryOp::Deref | UnaryOp::Cast => self.addr(operand),
                _ => Err(not_constant(expr)),
            },

            ExpressionKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::Add | BinaryOp::Sub => self.addr_arithmetic(expr, *op, lhs, rhs),
                BinaryOp::Member => {
                    let base = self.addr(lhs)?;
                    let member = match &rhs.kind {
                        ExpressionKind::Object(object) => &object.name,
                        _ => return Err(not_constant(expr)),
                    };
                    let offset = self
                        .types
                        .member_offset(lhs.ty, member)
                        .ok_or_else(|| not_constant(expr))?;
                    Ok(Address {
                        label: base.label,
                        offset: base.offset.wrapping_add(offset as i64),
                    })
                }
                BinaryOp::Comma => self.addr(rhs),
                _ => Err(not_constant(expr)),
            },

            ExpressionKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.truthy(condition)? {
                    self.addr(then_expr)
                } else {
                    self.addr(else_expr)
                }
            }

            _ => Err(not_constant(expr)),
        }
    }

    /// `p + i` / `p - i`: the integer side scales by the pointee width
    fn addr_arithmetic(
        &self,
        expr: &Expression,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<Address, EvalError> {
        let (pointer, index) = if self.types.pointer_target(lhs.ty).is_some() {
            (lhs, rhs)
        } else if op == BinaryOp::Add && self.types.pointer_target(rhs.ty).is_some() {
            (rhs, lhs)
        } else {
            return Err(not_constant(expr));
        };

        let step = self
            .types
            .pointer_target(expr.ty)
            .or_else(|| self.types.pointer_target(pointer.ty))
            .and_then(|pointee| self.types.step_width(pointee))
            .ok_or_else(|| not_constant(expr))?;

        let base = self.addr(pointer)?;
        let index = match self.arith(index)? {
            Value::Int { kind, v } => widen(kind, v) as i64,
            Value::Float { .. } => return Err(not_constant(expr)),
        };

        let delta = index.wrapping_mul(step as i64);
        let offset = if op == BinaryOp::Add {
            base.offset.wrapping_add(delta)
        } else {
            base.offset.wrapping_sub(delta)
        };
        Ok(Address {
            label: base.label,
            offset,
        })
    }

    /// The arithmetic kind a node folds in; non-arithmetic nodes are
    /// not constants in an arithmetic context
    fn node_kind(&self, expr: &Expression) -> Result<ArithKind, EvalError> {
        self.types
            .arith_kind(expr.ty)
            .ok_or_else(|| not_constant(expr))
    }

    /// Evaluate a subtree in the kind of its own type. Operand types
    /// already match node types because the type checker materialized
    /// every conversion as a cast node.
    fn arith(&self, expr: &Expression) -> Result<Value, EvalError> {
        match &expr.kind {
            ExpressionKind::Constant(Constant::Int(v)) => {
                let raw = Value::Int {
                    kind: IntKind::I64,
                    v: *v,
                };
                self.convert(raw, self.node_kind(expr)?, expr)
            }
            ExpressionKind::Constant(Constant::Float(v)) => {
                let raw = Value::Float {
                    kind: FloatKind::F64,
                    v: *v,
                };
                self.convert(raw, self.node_kind(expr)?, expr)
            }
            ExpressionKind::Constant(Constant::Str { .. }) => Err(not_constant(expr)),

            ExpressionKind::Enumerator { value, .. } => {
                let raw = Value::Int {
                    kind: IntKind::I64,
                    v: *value,
                };
                self.convert(raw, self.node_kind(expr)?, expr)
            }

            ExpressionKind::Identifier { .. }
            | ExpressionKind::Object(_)
            | ExpressionKind::TempVar { .. }
            | ExpressionKind::Call { .. } => Err(not_constant(expr)),

            ExpressionKind::Unary { op, operand } => self.unary(expr, *op, operand),

            ExpressionKind::Binary { op, lhs, rhs } => self.binary(expr, *op, lhs, rhs),

            ExpressionKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                // The condition folds eagerly; the untaken branch is
                // never evaluated and need not be constant
                if self.truthy(condition)? {
                    self.arith(then_expr)
                } else {
                    self.arith(else_expr)
                }
            }
        }
    }

    fn unary(
        &self,
        expr: &Expression,
        op: UnaryOp,
        operand: &Expression,
    ) -> Result<Value, EvalError> {
        match op {
            UnaryOp::Plus => self.arith(operand),
            UnaryOp::Minus => match self.arith(operand)? {
                Value::Int { kind, v } => Ok(Value::Int {
                    kind,
                    v: wrap(kind, -widen(kind, v)),
                }),
                Value::Float { kind, v } => Ok(float_value(kind, -v)),
            },
            UnaryOp::BitNot => match self.arith(operand)? {
                Value::Int { kind, v } => Ok(Value::Int {
                    kind,
                    v: wrap(kind, !widen(kind, v)),
                }),
                Value::Float { .. } => Err(not_constant(expr)),
            },
            UnaryOp::LogicalNot => {
                let truthy = self.truthy(operand)?;
                self.bool_result(expr, !truthy)
            }
            UnaryOp::Cast => {
                let value = self.arith(operand)?;
                self.convert(value, self.node_kind(expr)?, expr)
            }
            _ => Err(not_constant(expr)),
        }
    }

    fn binary(
        &self,
        expr: &Expression,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<Value, EvalError> {
        match op {
            BinaryOp::Comma => self.arith(rhs),

            BinaryOp::LogicalAnd => {
                let result = self.truthy(lhs)? && self.truthy(rhs)?;
                self.bool_result(expr, result)
            }
            BinaryOp::LogicalOr => {
                let result = self.truthy(lhs)? || self.truthy(rhs)?;
                self.bool_result(expr, result)
            }

            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::Greater
            | BinaryOp::LessEqual
            | BinaryOp::GreaterEqual => {
                let ordering = self.compare(expr, lhs, rhs)?;
                let result = match op {
                    BinaryOp::Equal => ordering == std::cmp::Ordering::Equal,
                    BinaryOp::NotEqual => ordering != std::cmp::Ordering::Equal,
                    BinaryOp::Less => ordering == std::cmp::Ordering::Less,
                    BinaryOp::Greater => ordering == std::cmp::Ordering::Greater,
                    BinaryOp::LessEqual => ordering != std::cmp::Ordering::Greater,
                    _ => ordering != std::cmp::Ordering::Less,
                };
                self.bool_result(expr, result)
            }

            BinaryOp::Shl | BinaryOp::Shr => self.shift(expr, op, lhs, rhs),

            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => self.arithmetic(expr, op, lhs, rhs),

            BinaryOp::Assign | BinaryOp::Member => Err(not_constant(expr)),
        }
    }

    fn arithmetic(
        &self,
        expr: &Expression,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<Value, EvalError> {
        let kind = self.node_kind(expr)?;
        if let Some(float_kind) = FloatKind::of(kind) {
            let l = self.eval_float_operand(lhs)?;
            let r = self.eval_float_operand(rhs)?;
            let v = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(EvalError::DivisionByZero {
                            location: expr.location(),
                        });
                    }
                    l / r
                }
                _ => return Err(not_constant(expr)),
            };
            return Ok(float_value(float_kind, v));
        }

        let int_kind = IntKind::of(kind).ok_or_else(|| not_constant(expr))?;
        let l = widen(int_kind, self.eval_int_operand(lhs, int_kind)?);
        let r = widen(int_kind, self.eval_int_operand(rhs, int_kind)?);

        // Only the low target-width bits survive `wrap`, so wrapping
        // i128 arithmetic is exact for every kind up to 64 bits
        let exact: i128 = match op {
            BinaryOp::Add => l.wrapping_add(r),
            BinaryOp::Sub => l.wrapping_sub(r),
            BinaryOp::Mul => l.wrapping_mul(r),
            BinaryOp::Div | BinaryOp::Mod => {
                if r == 0 {
                    return Err(EvalError::DivisionByZero {
                        location: expr.location(),
                    });
                }
                if op == BinaryOp::Div {
                    l / r
                } else {
                    l % r
                }
            }
            BinaryOp::BitAnd => l & r,
            BinaryOp::BitOr => l | r,
            BinaryOp::BitXor => l ^ r,
            _ => unreachable!("non-arithmetic operator {:?}", op),
        };
        Ok(Value::Int {
            kind: int_kind,
            v: wrap(int_kind, exact),
        })
    }

    fn shift(
        &self,
        expr: &Expression,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<Value, EvalError> {
        let kind = self.node_kind(expr)?;
        let int_kind = IntKind::of(kind).ok_or_else(|| not_constant(expr))?;

        let value = widen(int_kind, self.eval_int_operand(lhs, int_kind)?);
        let amount = match self.arith(rhs)? {
            Value::Int { kind, v } => widen(kind, v) as i64,
            Value::Float { .. } => return Err(not_constant(expr)),
        };

        let width = int_kind.width_bits();
        if amount < 0 || amount >= width as i64 {
            return Err(EvalError::ShiftOutOfRange {
                amount,
                width,
                location: expr.location(),
            });
        }

        let exact = match op {
            BinaryOp::Shl => value << amount,
            // Normalized values keep sign information, so `>>` is an
            // arithmetic shift for signed kinds and logical otherwise
            _ => value >> amount,
        };
        Ok(Value::Int {
            kind: int_kind,
            v: wrap(int_kind, exact),
        })
    }

    /// Compare two operands. Pointer comparisons fold only when the
    /// labels match or both sides are absolute.
    fn compare(
        &self,
        expr: &Expression,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<std::cmp::Ordering, EvalError> {
        if self.types.pointer_target(lhs.ty).is_some()
            || self.types.pointer_target(rhs.ty).is_some()
        {
            let a = self.addr(lhs)?;
            let b = self.addr(rhs)?;
            if a.label != b.label {
                return Err(not_constant(expr));
            }
            return Ok(a.offset.cmp(&b.offset));
        }

        let l = self.arith(lhs)?;
        let r = self.arith(rhs)?;
        match (l, r) {
            (Value::Int { kind: lk, v: lv }, Value::Int { kind: rk, v: rv }) => {
                Ok(widen(lk, lv).cmp(&widen(rk, rv)))
            }
            _ => {
                let lf = to_f64(l);
                let rf = to_f64(r);
                lf.partial_cmp(&rf).ok_or_else(|| not_constant(expr))
            }
        }
    }

    /// Truthiness of a scalar constant; pointers count as true when
    /// they carry a label or a nonzero offset
    fn truthy(&self, expr: &Expression) -> Result<bool, EvalError> {
        if self.types.pointer_target(expr.ty).is_some() {
            let addr = self.addr(expr)?;
            return Ok(addr.label.is_some() || addr.offset != 0);
        }
        match self.arith(expr)? {
            Value::Int { v, .. } => Ok(v != 0),
            Value::Float { v, .. } => Ok(v != 0.0),
        }
    }

    /// A 0/1 result in the node's own (integer) kind
    fn bool_result(&self, expr: &Expression, value: bool) -> Result<Value, EvalError> {
        let kind = IntKind::of(self.node_kind(expr)?).ok_or_else(|| not_constant(expr))?;
        Ok(Value::Int {
            kind,
            v: value as i64,
        })
    }

    fn eval_int_operand(&self, expr: &Expression, kind: IntKind) -> Result<i64, EvalError> {
        let value = self.arith(expr)?;
        self.value_to_int(value, kind, expr)
    }

    fn eval_float_operand(&self, expr: &Expression) -> Result<f64, EvalError> {
        Ok(to_f64(self.arith(expr)?))
    }

    /// C conversion semantics into an integer target kind
    fn value_to_int(
        &self,
        value: Value,
        kind: IntKind,
        expr: &Expression,
    ) -> Result<i64, EvalError> {
        match value {
            Value::Int { kind: from, v } => Ok(wrap(kind, widen(from, v))),
            Value::Float { v, .. } => {
                let truncated = v.trunc();
                let bits = kind.width_bits() as i32;
                let (min, max_exclusive) = if kind.is_signed() {
                    (-(2f64.powi(bits - 1)), 2f64.powi(bits - 1))
                } else {
                    (0.0, 2f64.powi(bits))
                };
                if !truncated.is_finite() || truncated < min || truncated >= max_exclusive {
                    return Err(EvalError::ValueOutOfRange {
                        value: v,
                        target: kind.to_string(),
                        location: expr.location(),
                    });
                }
                Ok(wrap(kind, truncated as i128))
            }
        }
    }

    /// C conversion semantics into an arbitrary arithmetic target
    fn convert(
        &self,
        value: Value,
        target: ArithKind,
        expr: &Expression,
    ) -> Result<Value, EvalError> {
        if target == ArithKind::Bool {
            let truthy = match value {
                Value::Int { v, .. } => v != 0,
                Value::Float { v, .. } => v != 0.0,
            };
            return Ok(Value::Int {
                kind: IntKind::U8,
                v: truthy as i64,
            });
        }
        if let Some(kind) = IntKind::of(target) {
            let v = self.value_to_int(value, kind, expr)?;
            return Ok(Value::Int { kind, v });
        }
        if let Some(kind) = FloatKind::of(target) {
            return Ok(float_value(kind, to_f64(value)));
        }
        // Complex folding is not supported
        Err(not_constant(expr))
    }
}

fn to_f64(value: Value) -> f64 {
    match value {
        Value::Int { kind, v } => widen(kind, v) as f64,
        Value::Float { v, .. } => v,
    }
}

/// Float arithmetic narrows to single precision when the kind asks
fn float_value(kind: FloatKind, v: f64) -> Value {
    let v = match kind {
        FloatKind::F32 => (v as f32) as f64,
        FloatKind::F64 => v,
    };
    Value::Float { kind, v }
}

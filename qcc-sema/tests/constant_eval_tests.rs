//! End-to-end constant evaluation scenarios
//!
//! Each test builds the typed AST a parser would produce for a C
//! fragment and checks the folded result.

use pretty_assertions::assert_eq;
use qcc_common::SourceSpan;
use qcc_sema::types::{ArithKind, TypeRef, TypeRegistry};
use qcc_sema::{
    Address, BinaryOp, Constant, EvalError, Evaluator, Expression, ExpressionKind, Linkage,
    Object, StorageClass, StringPool, UnaryOp, ValueCategory,
};

fn rvalue(kind: ExpressionKind, ty: TypeRef) -> Expression {
    Expression::new(kind, ty, ValueCategory::Rvalue, SourceSpan::unknown())
}

fn lvalue(kind: ExpressionKind, ty: TypeRef) -> Expression {
    Expression::new(kind, ty, ValueCategory::Lvalue, SourceSpan::unknown())
}

fn int_const(ty: TypeRef, v: i64) -> Expression {
    rvalue(ExpressionKind::Constant(Constant::Int(v)), ty)
}

fn binary(op: BinaryOp, lhs: Expression, rhs: Expression, ty: TypeRef) -> Expression {
    rvalue(
        ExpressionKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

fn unary(op: UnaryOp, operand: Expression, ty: TypeRef) -> Expression {
    rvalue(
        ExpressionKind::Unary {
            op,
            operand: Box::new(operand),
        },
        ty,
    )
}

fn static_object(name: &str, ty: TypeRef) -> Expression {
    lvalue(
        ExpressionKind::Object(Object::new(
            name.to_string(),
            StorageClass::Static,
            Linkage::External,
        )),
        ty,
    )
}

/// enum { A = 3, B = A + 2 }: the initializer of B folds to 5 and B
/// lands on the enum type as a named constant
#[test]
fn test_enum_value_folding() {
    let mut reg = TypeRegistry::new();
    let loc = qcc_common::SourceLocation::unknown();
    let int_ty = reg.arith(ArithKind::Int);

    let colors = reg.enumeration();
    reg.add_enumerator(colors, "A", 3, &loc).unwrap();

    // `A` is referenced with the enum type; it folds as its
    // underlying int
    let a = rvalue(
        ExpressionKind::Enumerator {
            name: "A".to_string(),
            value: reg.enumerator_value(colors, "A").unwrap(),
        },
        colors,
    );
    let b_init = binary(BinaryOp::Add, a, int_const(int_ty, 2), int_ty);

    let b_value = {
        let ev = Evaluator::new(&reg);
        ev.eval_int(&b_init).unwrap()
    };
    assert_eq!(b_value, 5);

    reg.add_enumerator(colors, "B", b_value, &loc).unwrap();
    assert_eq!(reg.enumerator_value(colors, "B"), Some(5));
}

/// static int a[10]; int *p = a + 3; the initializer of p folds to
/// (label "a", offset 12) with sizeof(int) == 4
#[test]
fn test_array_address_arithmetic() {
    let mut reg = TypeRegistry::new();
    let int_ty = reg.arith(ArithKind::Int);
    let long_ty = reg.arith(ArithKind::Long);
    let arr_ty = reg.array_of(int_ty, Some(10));
    let p_int = reg.pointer_to(int_ty);

    // The array decays through an explicit cast; the index is ptrdiff_t
    let a = static_object("a", arr_ty);
    let decayed = unary(UnaryOp::Cast, a, p_int);
    let init = binary(BinaryOp::Add, decayed, int_const(long_ty, 3), p_int);

    let ev = Evaluator::new(&reg);
    assert_eq!(
        ev.eval_addr(&init).unwrap(),
        Address {
            label: Some("a".to_string()),
            offset: 12,
        }
    );

    // Subtraction walks backward
    let a = static_object("a", arr_ty);
    let decayed = unary(UnaryOp::Cast, a, p_int);
    let back = binary(BinaryOp::Sub, decayed, int_const(long_ty, 2), p_int);
    assert_eq!(ev.eval_addr(&back).unwrap().offset, -8);
}

/// static const char *s = "hi"; the initializer folds to the string
/// pool label at offset 0
#[test]
fn test_string_literal_address() {
    let mut reg = TypeRegistry::new();
    let char_ty = reg.arith(ArithKind::Char);
    let p_char = reg.pointer_to(char_ty);

    let mut pool = StringPool::new();
    let pool_id = pool.intern("hi");

    let s_init = rvalue(
        ExpressionKind::Constant(Constant::Str {
            value: "hi".to_string(),
            pool_id,
        }),
        p_char,
    );

    let ev = Evaluator::new(&reg);
    assert_eq!(
        ev.eval_addr(&s_init).unwrap(),
        Address {
            label: Some(StringPool::label(pool_id)),
            offset: 0,
        }
    );
}

/// &s.i for a static struct: the member offset lands in the address
#[test]
fn test_member_address() {
    let mut reg = TypeRegistry::new();
    let char_ty = reg.arith(ArithKind::Char);
    let int_ty = reg.arith(ArithKind::Int);
    let loc = qcc_common::SourceLocation::unknown();

    let s_ty = reg.record(true, true);
    reg.add_member(s_ty, "c", char_ty, &loc).unwrap();
    reg.add_member(s_ty, "i", int_ty, &loc).unwrap();
    reg.complete_record(s_ty, &loc).unwrap();
    let p_int = reg.pointer_to(int_ty);

    let s = static_object("s", s_ty);
    let member = lvalue(
        ExpressionKind::Object(Object::new(
            "i".to_string(),
            StorageClass::Auto,
            Linkage::None,
        )),
        int_ty,
    );
    let access = Expression::new(
        ExpressionKind::Binary {
            op: BinaryOp::Member,
            lhs: Box::new(s),
            rhs: Box::new(member),
        },
        int_ty,
        ValueCategory::Lvalue,
        SourceSpan::unknown(),
    );
    let addr_of = unary(UnaryOp::AddressOf, access, p_int);

    let ev = Evaluator::new(&reg);
    assert_eq!(
        ev.eval_addr(&addr_of).unwrap(),
        Address {
            label: Some("s".to_string()),
            offset: 4,
        }
    );
}

/// 1 ? 2 : (1/0) folds to 2; the untaken branch is never evaluated
#[test]
fn test_untaken_branch_not_evaluated() {
    let mut reg = TypeRegistry::new();
    let int_ty = reg.arith(ArithKind::Int);

    let bad = binary(
        BinaryOp::Div,
        int_const(int_ty, 1),
        int_const(int_ty, 0),
        int_ty,
    );
    let cond = rvalue(
        ExpressionKind::Conditional {
            condition: Box::new(int_const(int_ty, 1)),
            then_expr: Box::new(int_const(int_ty, 2)),
            else_expr: Box::new(bad),
        },
        int_ty,
    );

    let ev = Evaluator::new(&reg);
    assert_eq!(ev.eval_int(&cond).unwrap(), 2);
}

/// int x = 1 << 40 overflows a 32-bit int and is rejected
#[test]
fn test_shift_exceeding_width_fails() {
    let mut reg = TypeRegistry::new();
    let int_ty = reg.arith(ArithKind::Int);

    let shifted = binary(
        BinaryOp::Shl,
        int_const(int_ty, 1),
        int_const(int_ty, 40),
        int_ty,
    );

    let ev = Evaluator::new(&reg);
    assert!(matches!(
        ev.eval_int(&shifted),
        Err(EvalError::ShiftOutOfRange { amount: 40, .. })
    ));
}

/// Pointer comparisons fold only when the labels agree
#[test]
fn test_pointer_comparison() {
    let mut reg = TypeRegistry::new();
    let int_ty = reg.arith(ArithKind::Int);
    let p_int = reg.pointer_to(int_ty);

    let addr_a = |reg: &mut TypeRegistry| {
        let a = static_object("a", int_ty);
        unary(UnaryOp::AddressOf, a, reg.pointer_to(int_ty))
    };

    let same = binary(
        BinaryOp::Equal,
        addr_a(&mut reg),
        addr_a(&mut reg),
        int_ty,
    );
    let ev = Evaluator::new(&reg);
    assert_eq!(ev.eval_int(&same).unwrap(), 1);

    // &a == (int*)0 is not a constant: the labels differ
    let zero = unary(UnaryOp::Cast, int_const(int_ty, 0), p_int);
    let a = static_object("a", int_ty);
    let addr = unary(UnaryOp::AddressOf, a, p_int);
    let mixed = binary(BinaryOp::Equal, addr, zero, int_ty);
    assert!(matches!(
        ev.eval_int(&mixed),
        Err(EvalError::NotConstant { .. })
    ));

    // Two absolute addresses compare fine
    let lhs = unary(UnaryOp::Cast, int_const(int_ty, 8), p_int);
    let rhs = unary(UnaryOp::Cast, int_const(int_ty, 8), p_int);
    let absolute = binary(BinaryOp::Equal, lhs, rhs, int_ty);
    assert_eq!(ev.eval_int(&absolute).unwrap(), 1);
}

/// The address of *p is p, and casts are transparent to addresses
#[test]
fn test_deref_and_cast_addresses() {
    let mut reg = TypeRegistry::new();
    let int_ty = reg.arith(ArithKind::Int);
    let long_ty = reg.arith(ArithKind::Long);
    let arr_ty = reg.array_of(int_ty, Some(4));
    let p_int = reg.pointer_to(int_ty);

    // &*(a + 1) == a + 4 bytes
    let a = static_object("a", arr_ty);
    let decayed = unary(UnaryOp::Cast, a, p_int);
    let shifted = binary(BinaryOp::Add, decayed, int_const(long_ty, 1), p_int);
    let deref = Expression::new(
        ExpressionKind::Unary {
            op: UnaryOp::Deref,
            operand: Box::new(shifted),
        },
        int_ty,
        ValueCategory::Lvalue,
        SourceSpan::unknown(),
    );
    let addr = unary(UnaryOp::AddressOf, deref, p_int);

    let ev = Evaluator::new(&reg);
    assert_eq!(
        ev.eval_addr(&addr).unwrap(),
        Address {
            label: Some("a".to_string()),
            offset: 4,
        }
    );
}

/// void* arithmetic steps by one byte
#[test]
fn test_void_pointer_arithmetic() {
    let mut reg = TypeRegistry::new();
    let long_ty = reg.arith(ArithKind::Long);
    let int_ty = reg.arith(ArithKind::Int);
    let p_void = reg.pointer_to(reg.void_type());

    let base = static_object("buf", int_ty);
    let cast = unary(UnaryOp::Cast, base, p_void);
    let moved = binary(BinaryOp::Add, cast, int_const(long_ty, 5), p_void);

    let ev = Evaluator::new(&reg);
    assert_eq!(ev.eval_addr(&moved).unwrap().offset, 5);
}

/// A non-static object never has a constant address
#[test]
fn test_automatic_object_rejected() {
    let mut reg = TypeRegistry::new();
    let int_ty = reg.arith(ArithKind::Int);
    let p_int = reg.pointer_to(int_ty);

    let local = lvalue(
        ExpressionKind::Object(Object::new(
            "tmp".to_string(),
            StorageClass::Auto,
            Linkage::None,
        )),
        int_ty,
    );
    let addr = unary(UnaryOp::AddressOf, local, p_int);

    let ev = Evaluator::new(&reg);
    assert!(matches!(
        ev.eval_addr(&addr),
        Err(EvalError::NotConstant { .. })
    ));
}

/// A block-scope static takes its mangled label
#[test]
fn test_mangled_static_label() {
    let mut reg = TypeRegistry::new();
    let int_ty = reg.arith(ArithKind::Int);
    let p_int = reg.pointer_to(int_ty);

    let mut object = Object::new("counter".to_string(), StorageClass::Static, Linkage::None);
    object.label = Some("counter.0".to_string());
    let expr = lvalue(ExpressionKind::Object(object), int_ty);
    let addr = unary(UnaryOp::AddressOf, expr, p_int);

    let ev = Evaluator::new(&reg);
    assert_eq!(
        ev.eval_addr(&addr).unwrap().label.as_deref(),
        Some("counter.0")
    );
}

//! Typing rule tables: binary and unary result types, cast permissions, and
//! the common-type search.
//!
//! The tables are small and searched linearly, mirroring how the analyzer
//! consults them: a miss is `ValueType::Unknown`, never an error by itself.

use crate::{
    ast::{BinaryOp, UnaryOp},
    value::ValueType,
};

struct BinaryRule {
    op: BinaryOp,
    left: ValueType,
    right: ValueType,
    result: ValueType,
}

const fn rule(op: BinaryOp, left: ValueType, right: ValueType, result: ValueType) -> BinaryRule {
    BinaryRule {
        op,
        left,
        right,
        result,
    }
}

use crate::ast::BinaryOp as B;
use crate::value::ValueType::{F64, I64, Str};

static BINARY_RULES: &[BinaryRule] = &[
    rule(B::Add, I64, I64, I64),
    rule(B::Add, F64, F64, F64),
    rule(B::Add, Str, Str, Str),
    rule(B::Sub, I64, I64, I64),
    rule(B::Sub, F64, F64, F64),
    rule(B::Mul, I64, I64, I64),
    rule(B::Mul, F64, F64, F64),
    // Integer division always produces a float; `//` is the integral form.
    rule(B::Div, I64, I64, F64),
    rule(B::Div, F64, F64, F64),
    rule(B::IntDiv, I64, I64, I64),
    rule(B::IntDiv, F64, F64, I64),
    rule(B::Pow, I64, I64, I64),
    rule(B::Pow, F64, F64, F64),
    rule(B::Less, I64, I64, I64),
    rule(B::Less, F64, F64, I64),
    rule(B::LessEq, I64, I64, I64),
    rule(B::LessEq, F64, F64, I64),
    rule(B::Greater, I64, I64, I64),
    rule(B::Greater, F64, F64, I64),
    rule(B::GreaterEq, I64, I64, I64),
    rule(B::GreaterEq, F64, F64, I64),
    rule(B::Eq, I64, I64, I64),
    rule(B::NotEq, I64, I64, I64),
    rule(B::And, I64, I64, I64),
    rule(B::And, F64, F64, I64),
    rule(B::Or, I64, I64, I64),
    rule(B::Or, F64, F64, I64),
    rule(B::BitAnd, I64, I64, I64),
    rule(B::BitOr, I64, I64, I64),
    rule(B::Shl, I64, I64, I64),
    rule(B::Shr, I64, I64, I64),
];

/// Result type of `(op, left, right)`, or `Unknown` when no rule matches.
#[must_use]
pub fn binary_result_type(op: BinaryOp, left: ValueType, right: ValueType) -> ValueType {
    for rule in BINARY_RULES {
        if rule.op == op && rule.left == left && rule.right == right {
            return rule.result;
        }
    }
    ValueType::Unknown
}

/// Result type of a unary operator, or `Unknown` when unsupported.
///
/// `+`/`-` preserve the numeric operand type; `!` yields i64 from either
/// numeric type; `~` requires i64. Increment and decrement have no typing
/// rule: the analyzer rejects them before consulting this table.
#[must_use]
pub fn unary_result_type(op: UnaryOp, operand: ValueType) -> ValueType {
    match op {
        UnaryOp::Plus | UnaryOp::Minus if operand.is_numeric() => operand,
        UnaryOp::Not if operand.is_numeric() => ValueType::I64,
        UnaryOp::BitNot if operand == ValueType::I64 => ValueType::I64,
        _ => ValueType::Unknown,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CastPermission {
    Always,
    ExplicitOnly,
    Never,
}

fn cast_permission(from: ValueType, to: ValueType) -> CastPermission {
    if from == to {
        return CastPermission::Always;
    }
    match (from, to) {
        (I64, F64) => CastPermission::Always,
        (F64, I64) => CastPermission::ExplicitOnly,
        _ => CastPermission::Never,
    }
}

/// True iff the cast is always allowed, or explicit-only and `is_explicit`.
#[must_use]
pub fn is_cast_allowed(from: ValueType, to: ValueType, is_explicit: bool) -> bool {
    match cast_permission(from, to) {
        CastPermission::Always => true,
        CastPermission::ExplicitOnly => is_explicit,
        CastPermission::Never => false,
    }
}

/// Smallest type reachable from both operands by at most one implicit cast
/// on each side; `Unknown` when none exists.
#[must_use]
pub fn common_type(a: ValueType, b: ValueType) -> ValueType {
    if a == b {
        return a;
    }
    if is_cast_allowed(a, b, false) {
        return b;
    }
    if is_cast_allowed(b, a, false) {
        return a;
    }
    ValueType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_yields_float() {
        assert_eq!(binary_result_type(B::Div, I64, I64), F64);
        assert_eq!(binary_result_type(B::IntDiv, I64, I64), I64);
        assert_eq!(binary_result_type(B::IntDiv, F64, F64), I64);
    }

    #[test]
    fn string_rules_cover_concatenation_only() {
        assert_eq!(binary_result_type(B::Add, Str, Str), Str);
        assert_eq!(binary_result_type(B::Sub, Str, Str), ValueType::Unknown);
        assert_eq!(binary_result_type(B::Eq, Str, Str), ValueType::Unknown);
    }

    #[test]
    fn mod_has_no_typing_rule() {
        assert_eq!(binary_result_type(B::Mod, I64, I64), ValueType::Unknown);
    }

    #[test]
    fn unary_rules() {
        assert_eq!(unary_result_type(UnaryOp::Minus, I64), I64);
        assert_eq!(unary_result_type(UnaryOp::Minus, F64), F64);
        assert_eq!(unary_result_type(UnaryOp::Not, F64), I64);
        assert_eq!(unary_result_type(UnaryOp::BitNot, I64), I64);
        assert_eq!(unary_result_type(UnaryOp::BitNot, F64), ValueType::Unknown);
        assert_eq!(
            unary_result_type(UnaryOp::Increment, I64),
            ValueType::Unknown
        );
    }

    #[test]
    fn cast_permissions() {
        assert!(is_cast_allowed(I64, I64, false));
        assert!(is_cast_allowed(I64, F64, false));
        assert!(!is_cast_allowed(F64, I64, false));
        assert!(is_cast_allowed(F64, I64, true));
        assert!(!is_cast_allowed(Str, I64, true));
    }

    #[test]
    fn common_type_prefers_the_implicit_target() {
        assert_eq!(common_type(I64, F64), F64);
        assert_eq!(common_type(F64, I64), F64);
        assert_eq!(common_type(I64, I64), I64);
        assert_eq!(common_type(Str, I64), ValueType::Unknown);
    }
}

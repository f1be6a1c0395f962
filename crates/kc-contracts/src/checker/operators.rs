//! Operand-type compatibility table for binary operators.

use crate::domain::ast::BinOp;
use crate::domain::types::Type;

/// Result type of `lhs op rhs`, or an `Error` type if the pair is not allowed.
#[must_use]
pub fn binop_type(op: BinOp, lhs: &Type, rhs: &Type) -> Type {
    use Type::{Bool, Int, Koin, Nat};

    if lhs.is_error() {
        return lhs.clone();
    }
    if rhs.is_error() {
        return rhs.clone();
    }

    let result = match op {
        BinOp::Add => match (lhs, rhs) {
            (Nat, Nat) => Some(Nat),
            (Nat, Int) | (Int, Nat) | (Int, Int) => Some(Int),
            (Koin, Koin) => Some(Koin),
            _ => None,
        },
        BinOp::Sub => match (lhs, rhs) {
            (Nat | Int, Nat | Int) => Some(Int),
            (Koin, Koin) => Some(Koin),
            _ => None,
        },
        BinOp::Mul => match (lhs, rhs) {
            (Nat, Nat) => Some(Nat),
            (Nat, Int) | (Int, Nat) | (Int, Int) => Some(Int),
            (Koin, Nat) | (Nat, Koin) => Some(Koin),
            _ => None,
        },
        BinOp::Div => match (lhs, rhs) {
            (Koin, Koin) => Some(Type::Tuple(vec![Nat, Koin])),
            (Koin, Nat) => Some(Type::Tuple(vec![Koin, Koin])),
            (Nat, Nat) => Some(Type::Tuple(vec![Nat, Nat])),
            (Nat, Int) | (Int, Int | Nat) => Some(Type::Tuple(vec![Int, Nat])),
            _ => None,
        },
        BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Leq | BinOp::Geq => {
            (lhs == rhs && lhs.is_comparable()).then_some(Bool)
        }
        BinOp::And | BinOp::Or => matches!((lhs, rhs), (Bool, Bool)).then_some(Bool),
    };

    result.unwrap_or_else(|| Type::error(format!("operator {op:?} not defined on ({lhs}, {rhs})")))
}

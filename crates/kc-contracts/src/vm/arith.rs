//! # Runtime Arithmetic
//!
//! Evaluates binary operators on already-checked values. The operand
//! variants select the numeric path; every operation is checked and aborts
//! instead of wrapping.

use crate::domain::ast::BinOp;
use crate::domain::values::Value;
use crate::errors::Abort;
use std::cmp::Ordering;

/// Applies a strict (non short-circuit) binary operator.
///
/// # Errors
///
/// Returns the abort raised by the operation, or `Abort::Internal` for an
/// operand pair the checker should have rejected.
pub fn binop(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, Abort> {
    match op {
        BinOp::Add => add(lhs, rhs),
        BinOp::Sub => sub(lhs, rhs),
        BinOp::Mul => mul(lhs, rhs),
        BinOp::Div => div(lhs, rhs),
        BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Leq | BinOp::Geq => {
            let ordering = lhs
                .compare(rhs)
                .ok_or_else(|| mismatch(op, lhs, rhs))?;
            Ok(Value::BoolVal(compare(op, ordering)))
        }
        BinOp::And | BinOp::Or => match (lhs, rhs) {
            (Value::BoolVal(a), Value::BoolVal(b)) => Ok(Value::BoolVal(if op == BinOp::And {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(mismatch(op, lhs, rhs)),
        },
    }
}

fn compare(op: BinOp, ordering: Ordering) -> bool {
    match op {
        BinOp::Eq => ordering == Ordering::Equal,
        BinOp::Neq => ordering != Ordering::Equal,
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::Gt => ordering == Ordering::Greater,
        BinOp::Leq => ordering != Ordering::Greater,
        _ => ordering != Ordering::Less,
    }
}

fn mismatch(op: BinOp, lhs: &Value, rhs: &Value) -> Abort {
    Abort::Internal(format!("operator {op:?} applied to {lhs} and {rhs}"))
}

/// Signed view of a nat or int operand.
fn signed(value: &Value) -> Option<Result<i64, Abort>> {
    match value {
        Value::IntVal(i) => Some(Ok(*i)),
        Value::NatVal(n) => Some(i64::try_from(*n).map_err(|_| Abort::Overflow)),
        _ => None,
    }
}

fn signed_pair(op: BinOp, lhs: &Value, rhs: &Value) -> Result<(i64, i64), Abort> {
    match (signed(lhs), signed(rhs)) {
        (Some(a), Some(b)) => Ok((a?, b?)),
        _ => Err(mismatch(op, lhs, rhs)),
    }
}

fn add(lhs: &Value, rhs: &Value) -> Result<Value, Abort> {
    match (lhs, rhs) {
        (Value::NatVal(a), Value::NatVal(b)) => {
            a.checked_add(*b).map(Value::NatVal).ok_or(Abort::Overflow)
        }
        (Value::KoinVal(a), Value::KoinVal(b)) => {
            a.checked_add(*b).map(Value::KoinVal).ok_or(Abort::Overflow)
        }
        _ => {
            let (a, b) = signed_pair(BinOp::Add, lhs, rhs)?;
            a.checked_add(b).map(Value::IntVal).ok_or(Abort::Overflow)
        }
    }
}

fn sub(lhs: &Value, rhs: &Value) -> Result<Value, Abort> {
    match (lhs, rhs) {
        (Value::KoinVal(a), Value::KoinVal(b)) => a
            .checked_sub(*b)
            .map(Value::KoinVal)
            .ok_or(Abort::KoinUnderflow),
        _ => {
            let (a, b) = signed_pair(BinOp::Sub, lhs, rhs)?;
            a.checked_sub(b).map(Value::IntVal).ok_or(Abort::Overflow)
        }
    }
}

fn mul(lhs: &Value, rhs: &Value) -> Result<Value, Abort> {
    match (lhs, rhs) {
        (Value::NatVal(a), Value::NatVal(b)) => {
            a.checked_mul(*b).map(Value::NatVal).ok_or(Abort::Overflow)
        }
        (Value::KoinVal(k), Value::NatVal(n)) | (Value::NatVal(n), Value::KoinVal(k)) => {
            k.checked_mul(*n).map(Value::KoinVal).ok_or(Abort::Overflow)
        }
        _ => {
            let (a, b) = signed_pair(BinOp::Mul, lhs, rhs)?;
            a.checked_mul(b).map(Value::IntVal).ok_or(Abort::Overflow)
        }
    }
}

/// `(quotient, remainder)`. Signed division is Euclidean so the remainder
/// is never negative: `-17 / 5 = (-4, 3)`.
fn div(lhs: &Value, rhs: &Value) -> Result<Value, Abort> {
    let pair = |q: Value, r: Value| Value::TupleVal(vec![q, r]);
    match (lhs, rhs) {
        (_, Value::NatVal(0) | Value::IntVal(0) | Value::KoinVal(0)) => Err(Abort::DivisionByZero),
        (Value::KoinVal(a), Value::KoinVal(b)) => {
            Ok(pair(Value::NatVal(a / b), Value::KoinVal(a % b)))
        }
        (Value::KoinVal(a), Value::NatVal(b)) => {
            Ok(pair(Value::KoinVal(a / b), Value::KoinVal(a % b)))
        }
        (Value::NatVal(a), Value::NatVal(b)) => Ok(pair(Value::NatVal(a / b), Value::NatVal(a % b))),
        _ => {
            let (a, b) = signed_pair(BinOp::Div, lhs, rhs)?;
            let quotient = a.checked_div_euclid(b).ok_or(Abort::Overflow)?;
            let remainder = a.checked_rem_euclid(b).ok_or(Abort::Overflow)?;
            let remainder = u64::try_from(remainder).map_err(|_| Abort::Overflow)?;
            Ok(pair(Value::IntVal(quotient), Value::NatVal(remainder)))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

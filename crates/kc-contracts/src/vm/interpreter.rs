//! # Interpreter
//!
//! Tree-walking evaluator over checked programs.
//!
//! Every step pays [`costs::EVAL_STEP`] before doing any work. Aborts travel
//! as `Err(Abort)` through every step and are turned into a failure outcome
//! only at [`call_entry`], so a contract body can never leave storage
//! partially updated.

use crate::domain::ast::{BinOp, EntryView, ExprKind, Literal, Param, Pattern, TypedExpr};
use crate::domain::builtins::Builtin;
use crate::domain::entities::{CallOutcome, EntryCall};
use crate::domain::types::Type;
use crate::domain::values::{Operation, Value};
use crate::errors::Abort;
use crate::vm::arith;
use crate::vm::gas::{costs, GasMeter};
use im::OrdMap;
use tracing::debug;

/// Runtime variable bindings.
pub type ValueEnv = OrdMap<String, Value>;

const RED_ZONE: usize = 128 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

// =============================================================================
// CALL CONTEXT
// =============================================================================

/// Per-call state seen by `Current.*` and updated by outgoing operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallContext {
    /// Koin attached to this call.
    pub amount: u64,
    /// Contract balance before this call.
    pub balance: u64,
    /// Koin committed to Transfer and ContractCall operations so far.
    pub spent: u64,
}

impl CallContext {
    /// Fresh context with nothing spent.
    #[must_use]
    pub fn new(amount: u64, balance: u64) -> Self {
        Self {
            amount,
            balance,
            spent: 0,
        }
    }

    /// Commits `amount` to an outgoing operation.
    ///
    /// # Errors
    ///
    /// Returns `Abort::Overspend` if total spending would exceed
    /// `balance + amount`.
    pub fn spend(&mut self, amount: u64) -> Result<(), Abort> {
        let spent = u128::from(self.spent) + u128::from(amount);
        let available = u128::from(self.balance) + u128::from(self.amount);
        if spent > available {
            return Err(Abort::Overspend);
        }
        self.spent = u64::try_from(spent).map_err(|_| Abort::Overspend)?;
        Ok(())
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Invokes an entrypoint of a checked program.
///
/// Never fails: any abort becomes `[FailWith(message)]` with the input
/// storage, zero spent, and the gas left at the abort point.
#[must_use]
pub fn call_entry(program: &TypedExpr, call: &EntryCall) -> CallOutcome {
    let mut interpreter = Interpreter::new(call.gas, CallContext::new(call.amount, call.balance));
    match interpreter.run_entry(program, call) {
        Ok((operations, storage)) => CallOutcome {
            operations,
            storage,
            spent: interpreter.context().spent,
            remaining_gas: interpreter.remaining_gas(),
        },
        Err(abort) => {
            debug!(
                entry = %call.entry,
                reason = %abort,
                remaining_gas = interpreter.remaining_gas(),
                "entrypoint aborted"
            );
            CallOutcome::failure(
                abort.to_string(),
                call.storage.clone(),
                interpreter.remaining_gas(),
            )
        }
    }
}

/// Evaluates the storage initializer of a checked program.
///
/// # Errors
///
/// Returns the abort raised while evaluating the initializer.
pub fn init_storage(program: &TypedExpr, gas: u64) -> Result<(Value, u64), Abort> {
    let init = program
        .storage_init()
        .ok_or_else(|| Abort::Internal("program has no storage initializer".into()))?;
    let mut interpreter = Interpreter::new(gas, CallContext::default());
    let storage = interpreter.eval(init, &ValueEnv::new())?;
    Ok((storage, interpreter.remaining_gas()))
}

// =============================================================================
// INTERPRETER
// =============================================================================

/// Evaluator state for one call.
#[derive(Debug)]
pub struct Interpreter {
    gas: GasMeter,
    context: CallContext,
}

impl Interpreter {
    /// Interpreter with a fresh gas budget.
    #[must_use]
    pub fn new(gas: u64, context: CallContext) -> Self {
        Self {
            gas: GasMeter::new(gas),
            context,
        }
    }

    /// Gas left.
    #[must_use]
    pub fn remaining_gas(&self) -> u64 {
        self.gas.remaining()
    }

    /// Current call context.
    #[must_use]
    pub fn context(&self) -> &CallContext {
        &self.context
    }

    fn run_entry(
        &mut self,
        program: &TypedExpr,
        call: &EntryCall,
    ) -> Result<(Vec<Operation>, Value), Abort> {
        self.gas.charge(costs::EVAL_STEP)?;
        let view = program
            .entry(&call.entry)
            .ok_or_else(|| Abort::UnknownEntry(call.entry.clone()))?;
        let env = bind_entry(&view, &call.entry, &call.params, &call.storage)?;

        let (ops, storage) = match self.eval(view.body, &env)? {
            Value::TupleVal(pair) => match <[Value; 2]>::try_from(pair) {
                Ok([Value::ListVal(ops), storage]) => (ops, storage),
                _ => {
                    return Err(Abort::Internal(
                        "entrypoint did not return (operations, storage)".into(),
                    ))
                }
            },
            other => {
                return Err(Abort::Internal(format!(
                    "entrypoint returned {other} instead of (operations, storage)"
                )))
            }
        };
        let operations = ops
            .into_iter()
            .map(|op| match op {
                Value::OperationVal(op) => Ok(op),
                other => Err(Abort::Internal(format!("{other} is not an operation"))),
            })
            .collect::<Result<_, _>>()?;
        Ok((operations, storage))
    }

    /// Evaluates `expr` under `env`.
    ///
    /// # Errors
    ///
    /// Returns the first abort raised during evaluation.
    pub fn eval(&mut self, expr: &TypedExpr, env: &ValueEnv) -> Result<Value, Abort> {
        stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.eval_inner(expr, env))
    }

    fn eval_all(&mut self, exprs: &[TypedExpr], env: &ValueEnv) -> Result<Vec<Value>, Abort> {
        exprs.iter().map(|e| self.eval(e, env)).collect()
    }

    fn eval_bool(&mut self, expr: &TypedExpr, env: &ValueEnv) -> Result<bool, Abort> {
        match self.eval(expr, env)? {
            Value::BoolVal(b) => Ok(b),
            other => Err(Abort::Internal(format!("{other} is not a boolean"))),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn eval_inner(&mut self, expr: &TypedExpr, env: &ValueEnv) -> Result<Value, Abort> {
        self.gas.charge(costs::EVAL_STEP)?;

        match &expr.kind {
            ExprKind::TopLevel(_)
            | ExprKind::TypeDecl { .. }
            | ExprKind::EntryDecl { .. }
            | ExprKind::StorageInit(_) => Err(Abort::Internal(
                "declarations cannot be evaluated as expressions".into(),
            )),

            ExprKind::Literal(lit) => Ok(literal_value(lit)),

            ExprKind::Var(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| Abort::Internal(format!("unbound variable {name}"))),

            ExprKind::ModuleAccess { module, field } => Builtin::resolve(module, field)
                .map(Value::LambdaVal)
                .ok_or_else(|| Abort::Internal(format!("unknown built-in {module}.{field}"))),

            ExprKind::FieldAccess { target, field } => match self.eval(target, env)? {
                Value::StructVal(fields) => fields
                    .get(field)
                    .cloned()
                    .ok_or_else(|| Abort::Internal(format!("missing field {field}"))),
                other => Err(Abort::Internal(format!("{other} has no field {field}"))),
            },

            ExprKind::BinOp { op, lhs, rhs } => match op {
                BinOp::And => {
                    let result = self.eval_bool(lhs, env)? && self.eval_bool(rhs, env)?;
                    Ok(Value::BoolVal(result))
                }
                BinOp::Or => {
                    let result = self.eval_bool(lhs, env)? || self.eval_bool(rhs, env)?;
                    Ok(Value::BoolVal(result))
                }
                _ => {
                    let lhs = self.eval(lhs, env)?;
                    let rhs = self.eval(rhs, env)?;
                    arith::binop(*op, &lhs, &rhs)
                }
            },

            ExprKind::Not(inner) => Ok(Value::BoolVal(!self.eval_bool(inner, env)?)),

            ExprKind::Let {
                pattern,
                value,
                body,
                ..
            } => {
                let value = self.eval(value, env)?;
                let env = bind_pattern(pattern, value, env)?;
                self.eval(body, &env)
            }

            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_bool(cond, env)? {
                    self.eval(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.eval(else_branch, env)
                } else {
                    Ok(Value::UnitVal)
                }
            }

            ExprKind::Sequence(items) => {
                let mut last = Value::UnitVal;
                for item in items {
                    last = self.eval(item, env)?;
                }
                Ok(last)
            }

            ExprKind::Tuple(items) => Ok(Value::TupleVal(self.eval_all(items, env)?)),

            ExprKind::List { items, .. } => Ok(Value::ListVal(self.eval_all(items, env)?)),

            ExprKind::Cons { head, tail } => {
                let head = self.eval(head, env)?;
                match self.eval(tail, env)? {
                    Value::ListVal(mut items) => {
                        items.insert(0, head);
                        Ok(Value::ListVal(items))
                    }
                    other => Err(Abort::Internal(format!("{other} is not a list"))),
                }
            }

            ExprKind::Some(inner) => Ok(Value::OptionVal(Some(Box::new(self.eval(inner, env)?)))),

            ExprKind::None(_) => Ok(Value::OptionVal(None)),

            ExprKind::MatchOption {
                scrutinee,
                none_branch,
                some_name,
                some_branch,
            } => match self.eval(scrutinee, env)? {
                Value::OptionVal(None) => self.eval(none_branch, env),
                Value::OptionVal(Some(inner)) => {
                    let env = bind_pattern(&Pattern::name(some_name.clone()), *inner, env)?;
                    self.eval(some_branch, &env)
                }
                other => Err(Abort::Internal(format!("{other} is not an option"))),
            },

            ExprKind::Struct(fields) => {
                let mut values = OrdMap::new();
                for (name, field) in fields {
                    values.insert(name.clone(), self.eval(field, env)?);
                }
                Ok(Value::StructVal(values))
            }

            ExprKind::UpdateStruct { root, path, value } => {
                let leaf = self.eval(value, env)?;
                let root = env
                    .get(root)
                    .ok_or_else(|| Abort::Internal(format!("unbound variable {root}")))?;
                update_field(root, path, leaf)
            }

            ExprKind::Call { callee, args } => {
                let builtin = match self.eval(callee, env)? {
                    Value::LambdaVal(builtin) => builtin,
                    other => return Err(Abort::Internal(format!("{other} is not callable"))),
                };
                let args = self.eval_all(args, env)?;
                self.apply(builtin, args)
            }
        }
    }

    /// Dispatches a built-in call.
    fn apply(&mut self, builtin: Builtin, args: Vec<Value>) -> Result<Value, Abort> {
        let bad_args = |args: &[Value]| {
            Abort::Internal(format!(
                "{builtin} applied to ({})",
                args.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        };

        match (builtin, args.as_slice()) {
            (Builtin::CurrentBalance, [Value::UnitVal]) => Ok(Value::KoinVal(self.context.balance)),
            (Builtin::CurrentAmount, [Value::UnitVal]) => Ok(Value::KoinVal(self.context.amount)),
            (Builtin::CurrentGas, [Value::UnitVal]) => Ok(Value::NatVal(self.gas.remaining())),
            (Builtin::CurrentFailwith, [Value::StringVal(message)]) => {
                Err(Abort::FailWith(message.clone()))
            }
            (Builtin::AccountDefault, [Value::KeyVal(key)]) => Ok(Value::AddressVal(key.clone())),
            (Builtin::AccountTransfer, [Value::KeyVal(key), Value::KoinVal(amount)]) => {
                self.context.spend(*amount)?;
                Ok(Value::OperationVal(Operation::Transfer {
                    key: key.clone(),
                    amount: *amount,
                }))
            }
            (
                Builtin::ContractCall,
                [Value::AddressVal(address), Value::KoinVal(amount), Value::StringVal(entry), params],
            ) => {
                self.context.spend(*amount)?;
                Ok(Value::OperationVal(Operation::ContractCall {
                    address: address.clone(),
                    amount: *amount,
                    entry: entry.clone(),
                    params: Box::new(params.clone()),
                }))
            }
            (_, args) => Err(bad_args(args)),
        }
    }
}

// =============================================================================
// BINDING
// =============================================================================

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::String(s) => Value::StringVal(s.clone()),
        Literal::Int(i) => Value::IntVal(*i),
        Literal::Nat(n) => Value::NatVal(*n),
        Literal::Bool(b) => Value::BoolVal(*b),
        Literal::Koin(k) => Value::KoinVal(*k),
        Literal::Key(k) => Value::KeyVal(k.clone()),
        Literal::Address(a) => Value::AddressVal(a.clone()),
        Literal::Unit => Value::UnitVal,
    }
}

/// Extends `env` with the names of `pattern` bound to `value`.
fn bind_pattern(pattern: &Pattern, value: Value, env: &ValueEnv) -> Result<ValueEnv, Abort> {
    let mut env = env.clone();
    let mut bind = |name: &String, value: Value| {
        if name != crate::checker::WILDCARD {
            env.insert(name.clone(), value);
        }
    };
    match (pattern.0.as_slice(), value) {
        ([], Value::UnitVal) => {}
        ([name], value) => bind(name, value),
        (names, Value::TupleVal(items)) if names.len() == items.len() => {
            for (name, item) in names.iter().zip(items) {
                bind(name, item);
            }
        }
        (_, value) => {
            return Err(Abort::Internal(format!(
                "pattern of arity {} cannot bind {value}",
                pattern.arity()
            )))
        }
    }
    Ok(env)
}

/// Checks externally supplied parameters and storage against the entry's
/// declared types and binds them.
fn bind_entry(
    view: &EntryView<'_>,
    entry: &str,
    params: &Value,
    storage: &Value,
) -> Result<ValueEnv, Abort> {
    let invalid = || Abort::InvalidParameters(entry.to_string());
    let Type::Lambda { params: types, .. } = view.ty else {
        return Err(Abort::Internal(format!("entrypoint {entry} is not well typed")));
    };
    let Some((storage_ty, param_types)) = types.split_last() else {
        return Err(Abort::Internal(format!("entrypoint {entry} has no storage type")));
    };
    if param_types.len() != view.params.len() || !storage.conforms_to(storage_ty) {
        return Err(invalid());
    }

    let names: Vec<String> = view.params.iter().map(|p: &Param| p.name.clone()).collect();
    let conforms = match (param_types, params) {
        ([], Value::UnitVal) => true,
        ([ty], value) => value.conforms_to(ty),
        (tys, Value::TupleVal(items)) => {
            tys.len() == items.len() && items.iter().zip(tys).all(|(v, t)| v.conforms_to(t))
        }
        _ => false,
    };
    if !conforms {
        return Err(invalid());
    }

    let env = bind_pattern(&Pattern(names), params.clone(), &ValueEnv::new())?;
    bind_pattern(view.storage, storage.clone(), &env)
}

/// Replaces the leaf at `path` inside `target`, sharing every other field.
fn update_field(target: &Value, path: &[String], leaf: Value) -> Result<Value, Abort> {
    let Value::StructVal(fields) = target else {
        return Err(Abort::Internal(format!("{target} is not a struct")));
    };
    let Some((segment, rest)) = path.split_first() else {
        return Err(Abort::Internal("empty struct update path".into()));
    };
    let current = fields
        .get(segment)
        .ok_or_else(|| Abort::Internal(format!("missing field {segment}")))?;
    let updated = if rest.is_empty() {
        leaf
    } else {
        update_field(current, rest, leaf)?
    };
    Ok(Value::StructVal(fields.update(segment.clone(), updated)))
}

// =============================================================================
// TESTS
// =============================================================================

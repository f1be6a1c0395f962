//! # Semantic Checker
//!
//! Assigns a type to every node of an untyped program, bottom-up.
//!
//! Type errors are data: a bad node gets an `Error` type and checking carries
//! on with its siblings. A depth-first scan of the finished tree decides
//! whether the program is accepted. The only hard stop is running out of gas,
//! which discards the tree.

pub mod operators;

use crate::domain::ast::{Expr, ExprKind, Literal, Param, Pattern, TypedExpr};
use crate::domain::builtins::Builtin;
use crate::domain::types::{struct_key, Scope, Type, VarEnv};
use crate::domain::values::KEY_LENGTH;
use crate::errors::OutOfGas;
use crate::vm::gas::{costs, GasMeter};
use operators::binop_type;
use std::collections::BTreeSet;
use tracing::debug;

/// Name of the storage type declaration.
pub const STORAGE_TYPE: &str = "storage";
/// Name of the mandatory entrypoint.
pub const MAIN_ENTRY: &str = "main";
/// Pattern name that binds nothing.
pub const WILDCARD: &str = "_";

const RED_ZONE: usize = 128 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// Outcome of checking a program.
#[derive(Clone, Debug, PartialEq)]
pub struct Checked {
    /// Typed tree; empty if gas ran out.
    pub program: TypedExpr,
    /// True if no node carries an error type.
    pub ok: bool,
    /// First error found, if any.
    pub error: Option<String>,
    /// Gas left.
    pub remaining_gas: u64,
}

impl Checked {
    /// Returns true if checking stopped because the budget ran out.
    #[must_use]
    pub fn ran_out_of_gas(&self) -> bool {
        !self.ok && self.remaining_gas == 0 && self.program == TypedExpr::empty()
    }
}

/// Checks a whole program against a gas budget.
#[must_use]
pub fn check(program: &Expr, gas: u64) -> Checked {
    let mut checker = Checker::new(gas);
    match checker.expr(program, &Scope::new()) {
        Ok(typed) => {
            let error = typed.find_error();
            if let Some(message) = &error {
                debug!(error = %message, "program rejected by checker");
            }
            Checked {
                ok: error.is_none(),
                error,
                program: typed,
                remaining_gas: checker.gas.remaining(),
            }
        }
        Err(OutOfGas) => {
            debug!(gas_limit = gas, "checker ran out of gas");
            Checked {
                program: TypedExpr::empty(),
                ok: false,
                error: Some(OutOfGas.to_string()),
                remaining_gas: 0,
            }
        }
    }
}

// =============================================================================
// CHECKER
// =============================================================================

struct Checker {
    gas: GasMeter,
    storage: Option<Type>,
}

impl Checker {
    fn new(gas: u64) -> Self {
        Self {
            gas: GasMeter::new(gas),
            storage: None,
        }
    }

    fn step(&mut self) -> Result<(), OutOfGas> {
        self.gas.charge(costs::CHECK_STEP)
    }

    fn expr(&mut self, expr: &Expr, scope: &Scope) -> Result<TypedExpr, OutOfGas> {
        stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.expr_inner(expr, scope))
    }

    fn exprs(&mut self, exprs: &[Expr], scope: &Scope) -> Result<Vec<TypedExpr>, OutOfGas> {
        exprs.iter().map(|e| self.expr(e, scope)).collect()
    }

    fn boxed(&mut self, expr: &Expr, scope: &Scope) -> Result<Box<TypedExpr>, OutOfGas> {
        self.expr(expr, scope).map(Box::new)
    }

    #[allow(clippy::too_many_lines)]
    fn expr_inner(&mut self, expr: &Expr, scope: &Scope) -> Result<TypedExpr, OutOfGas> {
        self.step()?;

        let (kind, ty) = match &expr.kind {
            ExprKind::TopLevel(items) => return self.program(items),

            ExprKind::TypeDecl { .. } | ExprKind::EntryDecl { .. } | ExprKind::StorageInit(_) => {
                let kind = expr.kind.map(|e| self.expr(e, scope));
                let kind = transpose(kind)?;
                (kind, Type::error("declarations are only allowed at top level"))
            }

            ExprKind::Literal(lit) => (ExprKind::Literal(lit.clone()), literal_type(lit)),

            ExprKind::Var(name) => {
                let ty = scope
                    .vars
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Type::error(format!("undeclared variable {name}")));
                (ExprKind::Var(name.clone()), ty)
            }

            ExprKind::ModuleAccess { module, field } => {
                let ty = match Builtin::resolve(module, field) {
                    Some(builtin) => builtin.signature().unwrap_or_else(|| {
                        Type::error(format!("{builtin} must be applied directly"))
                    }),
                    None => Type::error(format!("unknown built-in {module}.{field}")),
                };
                (
                    ExprKind::ModuleAccess {
                        module: module.clone(),
                        field: field.clone(),
                    },
                    ty,
                )
            }

            ExprKind::FieldAccess { target, field } => {
                let target = self.boxed(target, scope)?;
                let ty = match target.ty.field(field) {
                    Some(ty) => ty.clone(),
                    None if target.ty.is_error() => target.ty.clone(),
                    None => Type::error(format!("{} has no field {field}", target.ty)),
                };
                (
                    ExprKind::FieldAccess {
                        target,
                        field: field.clone(),
                    },
                    ty,
                )
            }

            ExprKind::BinOp { op, lhs, rhs } => {
                let lhs = self.boxed(lhs, scope)?;
                let rhs = self.boxed(rhs, scope)?;
                let ty = binop_type(*op, &lhs.ty, &rhs.ty);
                (ExprKind::BinOp { op: *op, lhs, rhs }, ty)
            }

            ExprKind::Not(inner) => {
                let inner = self.boxed(inner, scope)?;
                let ty = expect(&inner.ty, &Type::Bool, "operand of not");
                (ExprKind::Not(inner), ty)
            }

            ExprKind::Let {
                pattern,
                annotation,
                value,
                body,
            } => {
                let value = self.boxed(value, scope)?;
                let mut bound_ty = value.ty.clone();
                let mut problem = None;
                if let Some(annotation) = annotation {
                    let declared = self.translate(annotation, scope)?;
                    if declared != value.ty && !value.ty.is_error() {
                        problem = Some(format!(
                            "let annotated {declared} but bound to {}",
                            value.ty
                        ));
                    }
                    bound_ty = declared;
                }
                let body_scope = match self.match_pattern(pattern, &bound_ty, &scope.vars)? {
                    Some(vars) => scope.with_vars(vars),
                    None => {
                        problem.get_or_insert_with(|| {
                            format!("pattern of arity {} does not match {bound_ty}", pattern.arity())
                        });
                        scope.clone()
                    }
                };
                let body = self.boxed(body, &body_scope)?;
                let ty = problem.map_or_else(|| body.ty.clone(), Type::Error);
                (
                    ExprKind::Let {
                        pattern: pattern.clone(),
                        annotation: annotation.clone(),
                        value,
                        body,
                    },
                    ty,
                )
            }

            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.boxed(cond, scope)?;
                let then_branch = self.boxed(then_branch, scope)?;
                let else_branch = match else_branch {
                    Some(e) => Some(self.boxed(e, scope)?),
                    None => None,
                };
                let ty = if cond.ty != Type::Bool {
                    expect(&cond.ty, &Type::Bool, "if condition")
                } else if let Some(else_branch) = &else_branch {
                    expect(&else_branch.ty, &then_branch.ty, "else branch")
                } else {
                    expect(&then_branch.ty, &Type::Unit, "if without else")
                };
                (
                    ExprKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                    ty,
                )
            }

            ExprKind::Sequence(items) => {
                let items = self.exprs(items, scope)?;
                let ty = match items.split_last() {
                    None => Type::Unit,
                    Some((last, init)) => init
                        .iter()
                        .find(|e| e.ty != Type::Unit)
                        .map_or_else(
                            || last.ty.clone(),
                            |e| expect(&e.ty, &Type::Unit, "non-final sequence element"),
                        ),
                };
                (ExprKind::Sequence(items), ty)
            }

            ExprKind::Tuple(items) => {
                let items = self.exprs(items, scope)?;
                let ty = Type::Tuple(items.iter().map(|e| e.ty.clone()).collect());
                (ExprKind::Tuple(items), ty)
            }

            ExprKind::List { elem_ty, items } => {
                let declared = match elem_ty {
                    Some(t) => Some(self.translate(t, scope)?),
                    None => None,
                };
                let items = self.exprs(items, scope)?;
                let elem = declared.or_else(|| items.first().map(|e| e.ty.clone()));
                let ty = match elem {
                    None => Type::error("cannot infer the element type of an empty list"),
                    Some(elem) => items
                        .iter()
                        .find(|e| e.ty != elem)
                        .map_or_else(
                            || Type::list(elem.clone()),
                            |e| expect(&e.ty, &elem, "list element"),
                        ),
                };
                (
                    ExprKind::List {
                        elem_ty: elem_ty.clone(),
                        items,
                    },
                    ty,
                )
            }

            ExprKind::Cons { head, tail } => {
                let head = self.boxed(head, scope)?;
                let tail = self.boxed(tail, scope)?;
                let ty = match &tail.ty {
                    Type::List(elem) if **elem == head.ty => tail.ty.clone(),
                    Type::List(elem) => expect(&head.ty, elem, "consed element"),
                    other => expect(other, &Type::list(head.ty.clone()), "cons tail"),
                };
                (ExprKind::Cons { head, tail }, ty)
            }

            ExprKind::Some(inner) => {
                let inner = self.boxed(inner, scope)?;
                let ty = if inner.ty.is_error() {
                    inner.ty.clone()
                } else {
                    Type::option(inner.ty.clone())
                };
                (ExprKind::Some(inner), ty)
            }

            ExprKind::None(elem) => {
                let ty = Type::option(self.translate(elem, scope)?);
                (ExprKind::None(elem.clone()), ty)
            }

            ExprKind::MatchOption {
                scrutinee,
                none_branch,
                some_name,
                some_branch,
            } => {
                let scrutinee = self.boxed(scrutinee, scope)?;
                let (inner, problem) = match &scrutinee.ty {
                    Type::Option(inner) => ((**inner).clone(), None),
                    other => (
                        Type::error("not an option"),
                        Some(expect(other, &Type::option(Type::Unit), "match scrutinee")),
                    ),
                };
                let none_branch = self.boxed(none_branch, scope)?;
                let some_scope = if some_name == WILDCARD {
                    scope.clone()
                } else {
                    scope.bind(some_name, inner)
                };
                let some_branch = self.boxed(some_branch, &some_scope)?;
                let ty = problem
                    .unwrap_or_else(|| expect(&some_branch.ty, &none_branch.ty, "Some branch"));
                (
                    ExprKind::MatchOption {
                        scrutinee,
                        none_branch,
                        some_name: some_name.clone(),
                        some_branch,
                    },
                    ty,
                )
            }

            ExprKind::Struct(fields) => {
                let mut typed = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    typed.push((name.clone(), self.expr(value, scope)?));
                }
                let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
                let key = struct_key(&names);
                let ty = match scope.structs.get(&key) {
                    None => Type::error(format!("no struct type declared with fields {{{key}}}")),
                    Some(declared @ Type::Struct(declared_fields)) => declared_fields
                        .iter()
                        .zip(&typed)
                        .find(|((_, want), (_, got))| *want != got.ty)
                        .map_or_else(
                            || declared.clone(),
                            |((name, want), (_, got))| {
                                expect(&got.ty, want, &format!("field {name}"))
                            },
                        ),
                    Some(other) => Type::error(format!("struct registry holds {other}")),
                };
                (ExprKind::Struct(typed), ty)
            }

            ExprKind::UpdateStruct { root, path, value } => {
                let value = self.boxed(value, scope)?;
                let ty = match scope.vars.get(root) {
                    None => Type::error(format!("undeclared variable {root}")),
                    Some(root_ty) => update_type(root_ty, path, &value.ty),
                };
                (
                    ExprKind::UpdateStruct {
                        root: root.clone(),
                        path: path.clone(),
                        value,
                    },
                    ty,
                )
            }

            ExprKind::Call { callee, args } => {
                let args = self.exprs(args, scope)?;
                let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
                let callee = match &callee.kind {
                    ExprKind::ModuleAccess { module, field }
                        if Builtin::resolve(module, field) == Some(Builtin::ContractCall) =>
                    {
                        self.step()?;
                        let ty = match arg_types.as_slice() {
                            [_, _, _, params] => Builtin::contract_call_signature(params.clone()),
                            _ => Type::error("Contract.call expects 4 arguments"),
                        };
                        let kind = ExprKind::ModuleAccess {
                            module: module.clone(),
                            field: field.clone(),
                        };
                        Box::new(TypedExpr::new(kind, ty))
                    }
                    _ => self.boxed(callee, scope)?,
                };
                let ty = call_type(&callee.ty, &arg_types);
                (ExprKind::Call { callee, args }, ty)
            }
        };

        Ok(TypedExpr::new(kind, ty))
    }

    // -------------------------------------------------------------------------
    // Declarations
    // -------------------------------------------------------------------------

    fn program(&mut self, items: &[Expr]) -> Result<TypedExpr, OutOfGas> {
        let mut scope = Scope::new();
        let mut typed = Vec::with_capacity(items.len());
        let mut entries = BTreeSet::new();
        let mut inits = 0usize;

        for item in items {
            let node = match &item.kind {
                ExprKind::TypeDecl { name, ty } => {
                    self.step()?;
                    let (node, next) = self.type_decl(name, ty, &scope)?;
                    scope = next;
                    node
                }
                ExprKind::EntryDecl {
                    name,
                    params,
                    storage,
                    body,
                } => {
                    self.step()?;
                    let node = self.entry_decl(name, params, storage, body, &scope, &entries)?;
                    entries.insert(name.clone());
                    node
                }
                ExprKind::StorageInit(init) => {
                    self.step()?;
                    inits += 1;
                    let init = self.boxed(init, &scope.with_vars(VarEnv::new()))?;
                    let ty = match &self.storage {
                        None => Type::error("storage type must be declared before its initializer"),
                        Some(storage) => expect(&init.ty, storage, "storage initializer"),
                    };
                    TypedExpr::new(ExprKind::StorageInit(init), ty)
                }
                _ => {
                    let mut node = self.expr(item, &scope)?;
                    node.ty = Type::error("only declarations are allowed at top level");
                    node
                }
            };
            typed.push(node);
        }

        let ty = if self.storage.is_none() {
            Type::error("program declares no storage type")
        } else if !entries.contains(MAIN_ENTRY) {
            Type::error("program declares no main entrypoint")
        } else if inits != 1 {
            Type::error(format!(
                "program must have exactly one storage initializer, found {inits}"
            ))
        } else {
            Type::Unit
        };

        Ok(TypedExpr::new(ExprKind::TopLevel(typed), ty))
    }

    fn type_decl(
        &mut self,
        name: &str,
        surface: &Type,
        scope: &Scope,
    ) -> Result<(TypedExpr, Scope), OutOfGas> {
        // A struct written out in full introduces a new struct type.
        let resolved = match surface {
            Type::Struct(fields) => {
                self.step()?;
                self.struct_fields(fields, scope)?
            }
            other => self.translate(other, scope)?,
        };
        let kind = ExprKind::TypeDecl {
            name: name.to_string(),
            ty: surface.clone(),
        };

        if scope.types.contains_key(name) {
            let ty = Type::error(format!("type {name} declared twice"));
            return Ok((TypedExpr::new(kind, ty), scope.clone()));
        }
        if resolved.find_error().is_some() {
            return Ok((TypedExpr::new(kind, resolved), scope.clone()));
        }

        let mut next = scope.clone();
        if let (Type::Struct(_), Some(names)) = (surface, resolved.field_names()) {
            let key = struct_key(&names);
            if next.structs.contains_key(&key) {
                let ty = Type::error(format!(
                    "struct with fields {{{key}}} is already declared"
                ));
                return Ok((TypedExpr::new(kind, ty), scope.clone()));
            }
            next.structs.insert(key, resolved.clone());
        }
        next.types.insert(name.to_string(), resolved.clone());
        if name == STORAGE_TYPE {
            self.storage = Some(resolved.clone());
        }
        Ok((TypedExpr::new(kind, resolved), next))
    }

    fn entry_decl(
        &mut self,
        name: &str,
        params: &[Param],
        storage_pattern: &Pattern,
        body: &Expr,
        scope: &Scope,
        entries: &BTreeSet<String>,
    ) -> Result<TypedExpr, OutOfGas> {
        let mut problem = entries
            .contains(name)
            .then(|| format!("entrypoint {name} declared twice"));
        let mut vars = scope.vars.clone();
        let mut param_types = Vec::with_capacity(params.len());
        let mut seen = BTreeSet::new();

        for param in params {
            self.step()?;
            let ty = match &param.ty {
                Some(ty) => self.translate(ty, scope)?,
                None => {
                    let message = format!("parameter {} of {name} has no type annotation", param.name);
                    problem.get_or_insert_with(|| message.clone());
                    Type::Error(message)
                }
            };
            if !seen.insert(param.name.as_str()) {
                problem.get_or_insert_with(|| format!("parameter {} bound twice", param.name));
            }
            vars.insert(param.name.clone(), ty.clone());
            param_types.push(ty);
        }

        let storage_ty = match &self.storage {
            Some(storage) => {
                let storage = storage.clone();
                match self.match_pattern(storage_pattern, &storage, &vars)? {
                    Some(bound) => vars = bound,
                    None => {
                        problem.get_or_insert_with(|| {
                            format!("storage pattern of {name} does not match {storage}")
                        });
                    }
                }
                storage
            }
            None => {
                problem.get_or_insert_with(|| {
                    "storage type must be declared before entrypoints".to_string()
                });
                Type::error("undeclared storage type")
            }
        };

        let body = self.boxed(body, &scope.with_vars(vars))?;
        let expected = Type::entry_result(storage_ty.clone());
        let ty = match problem {
            Some(message) => Type::Error(message),
            None if body.ty != expected && !body.ty.is_error() => Type::error(format!(
                "entrypoint {name} must return {expected}, found {}",
                body.ty
            )),
            None => {
                param_types.push(storage_ty);
                Type::Lambda {
                    params: param_types,
                    ret: Box::new(expected),
                }
            }
        };

        Ok(TypedExpr::new(
            ExprKind::EntryDecl {
                name: name.to_string(),
                params: params.to_vec(),
                storage: storage_pattern.clone(),
                body,
            },
            ty,
        ))
    }

    // -------------------------------------------------------------------------
    // Types and patterns
    // -------------------------------------------------------------------------

    /// Resolves declared aliases inside a surface type.
    ///
    /// A struct written inline must name a declared struct type, field types
    /// included.
    fn translate(&mut self, ty: &Type, scope: &Scope) -> Result<Type, OutOfGas> {
        self.step()?;
        Ok(match ty {
            Type::DeclaredAlias(name) => scope
                .types
                .get(name)
                .cloned()
                .unwrap_or_else(|| Type::error(format!("undeclared type {name}"))),
            Type::Option(inner) => Type::option(self.translate(inner, scope)?),
            Type::List(inner) => Type::list(self.translate(inner, scope)?),
            Type::Tuple(items) => Type::Tuple(
                items
                    .iter()
                    .map(|t| self.translate(t, scope))
                    .collect::<Result<_, _>>()?,
            ),
            Type::Struct(fields) => {
                let written = self.struct_fields(fields, scope)?;
                let Some(names) = written
                    .field_names()
                    .filter(|_| written.find_error().is_none())
                else {
                    return Ok(written);
                };
                let key = struct_key(&names);
                match scope.structs.get(&key) {
                    None => Type::error(format!("no struct type declared with fields {{{key}}}")),
                    Some(declared) if *declared == written => declared.clone(),
                    Some(declared) => expect(&written, declared, "struct annotation"),
                }
            }
            Type::Lambda { params, ret } => Type::Lambda {
                params: params
                    .iter()
                    .map(|t| self.translate(t, scope))
                    .collect::<Result<_, _>>()?,
                ret: Box::new(self.translate(ret, scope)?),
            },
            other => other.clone(),
        })
    }

    /// Translates the fields of a struct type, rejecting repeated names.
    fn struct_fields(&mut self, fields: &[(String, Type)], scope: &Scope) -> Result<Type, OutOfGas> {
        let mut names = BTreeSet::new();
        let mut out = Vec::with_capacity(fields.len());
        for (name, field_ty) in fields {
            if !names.insert(name.as_str()) {
                return Ok(Type::error(format!("field {name} declared twice")));
            }
            out.push((name.clone(), self.translate(field_ty, scope)?));
        }
        Ok(Type::Struct(out))
    }

    /// Binds the names of `pattern` against `ty`.
    ///
    /// A single name binds the whole type; several names require a tuple of
    /// the same arity. Returns `None` on mismatch.
    fn match_pattern(
        &mut self,
        pattern: &Pattern,
        ty: &Type,
        vars: &VarEnv,
    ) -> Result<Option<VarEnv>, OutOfGas> {
        self.step()?;

        let mut seen = BTreeSet::new();
        if pattern
            .0
            .iter()
            .any(|name| name != WILDCARD && !seen.insert(name.as_str()))
        {
            return Ok(None);
        }

        let bind = |vars: &mut VarEnv, name: &String, ty: &Type| {
            if name != WILDCARD {
                vars.insert(name.clone(), ty.clone());
            }
        };

        let mut vars = vars.clone();
        match (pattern.0.as_slice(), ty) {
            ([], Type::Unit) => {}
            ([], _) => return Ok(None),
            ([name], _) => bind(&mut vars, name, ty),
            (names, Type::Tuple(items)) if names.len() == items.len() => {
                for (name, item) in names.iter().zip(items) {
                    bind(&mut vars, name, item);
                }
            }
            _ => return Ok(None),
        }
        Ok(Some(vars))
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::String(_) => Type::String,
        Literal::Int(_) => Type::Int,
        Literal::Nat(_) => Type::Nat,
        Literal::Bool(_) => Type::Bool,
        Literal::Koin(_) => Type::Koin,
        Literal::Unit => Type::Unit,
        Literal::Key(k) if k.chars().count() == KEY_LENGTH => Type::Key,
        Literal::Address(a) if a.chars().count() == KEY_LENGTH => Type::Address,
        Literal::Key(k) | Literal::Address(k) => {
            Type::error(format!("{k:?} is not {KEY_LENGTH} characters long"))
        }
    }
}

/// `want` if `got` matches it, otherwise an error describing `what`.
fn expect(got: &Type, want: &Type, what: &str) -> Type {
    if got.is_error() {
        got.clone()
    } else if got == want {
        want.clone()
    } else {
        Type::error(format!("{what}: expected {want}, found {got}"))
    }
}

fn call_type(callee: &Type, args: &[Type]) -> Type {
    match callee {
        Type::Lambda { params, ret } => {
            if let Some(bad) = args.iter().find(|a| a.is_error()) {
                bad.clone()
            } else if params.as_slice() == args {
                (**ret).clone()
            } else {
                Type::error(format!(
                    "function of type {callee} applied to ({})",
                    args.iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            }
        }
        other if other.is_error() => other.clone(),
        other => Type::error(format!("{other} is not a function")),
    }
}

fn update_type(root: &Type, path: &[String], value: &Type) -> Type {
    if path.is_empty() {
        return Type::error("struct update needs a field path");
    }
    let mut current = root;
    for segment in path {
        match current.field(segment) {
            Some(ty) => current = ty,
            None => return Type::error(format!("{current} has no field {segment}")),
        }
    }
    match expect(value, current, "updated field") {
        ty if ty.is_error() => ty,
        _ => root.clone(),
    }
}

fn transpose(kind: ExprKind<Result<TypedExpr, OutOfGas>>) -> Result<ExprKind<TypedExpr>, OutOfGas> {
    if let Some(Err(e)) = kind.children().into_iter().find(|c| c.is_err()) {
        return Err(*e);
    }
    Ok(kind.map(|child| match child {
        Ok(typed) => typed.clone(),
        Err(_) => TypedExpr::empty(),
    }))
}

// =============================================================================
// TESTS
// =============================================================================

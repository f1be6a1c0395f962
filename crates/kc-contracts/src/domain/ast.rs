//! # Syntax Trees
//!
//! The untyped tree handed over by the external parser ([`Expr`]) and the
//! typed tree produced by the checker ([`TypedExpr`]). Both share
//! [`ExprKind`], parameterised over the child node type.

use crate::domain::types::Type;
use serde::{Deserialize, Serialize};

// =============================================================================
// NODE KINDS
// =============================================================================

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`, yields `(quotient, remainder)`
    Div,
    /// `=`
    Eq,
    /// `<>`
    Neq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Leq,
    /// `>=`
    Geq,
    /// `&&`
    And,
    /// `||`
    Or,
}

/// Literal constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    /// `"text"`
    String(String),
    /// `-3`
    Int(i64),
    /// `3p`
    Nat(u64),
    /// `true`
    Bool(bool),
    /// `1.5tz`, already scaled
    Koin(u64),
    /// Key literal.
    Key(String),
    /// Address literal.
    Address(String),
    /// `()`
    Unit,
}

/// Entrypoint parameter. The annotation is mandatory for the program to check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: Option<Type>,
}

/// Binding pattern: a single name, or a flat tuple of names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern(pub Vec<String>);

impl Pattern {
    /// Pattern binding one name.
    pub fn name(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Tuple pattern.
    pub fn tuple<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Number of names.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

/// Expression node, generic over its children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExprKind<E> {
    /// Whole program.
    TopLevel(Vec<E>),
    /// `type name = ty`
    TypeDecl {
        /// Declared name.
        name: String,
        /// Surface type.
        ty: Type,
    },
    /// `let%entry name (params) (storage) = body`
    EntryDecl {
        /// Entrypoint name.
        name: String,
        /// Parameters.
        params: Vec<Param>,
        /// Storage pattern.
        storage: Pattern,
        /// Body.
        body: Box<E>,
    },
    /// `let%init storage = e`
    StorageInit(Box<E>),
    /// Constant.
    Literal(Literal),
    /// Variable reference.
    Var(String),
    /// `Module.field`
    ModuleAccess {
        /// Module name.
        module: String,
        /// Member name.
        field: String,
    },
    /// `target.field`
    FieldAccess {
        /// Struct expression.
        target: Box<E>,
        /// Field name.
        field: String,
    },
    /// Binary operation.
    BinOp {
        /// Operator.
        op: BinOp,
        /// Left operand.
        lhs: Box<E>,
        /// Right operand.
        rhs: Box<E>,
    },
    /// `not e`
    Not(Box<E>),
    /// `let pattern (: annotation) = value in body`
    Let {
        /// Binding pattern.
        pattern: Pattern,
        /// Optional type annotation.
        annotation: Option<Type>,
        /// Bound expression.
        value: Box<E>,
        /// Scope of the binding.
        body: Box<E>,
    },
    /// `if cond then a (else b)`
    If {
        /// Condition.
        cond: Box<E>,
        /// Then branch.
        then_branch: Box<E>,
        /// Else branch.
        else_branch: Option<Box<E>>,
    },
    /// `e1; e2; ...`
    Sequence(Vec<E>),
    /// `(a, b, ...)`
    Tuple(Vec<E>),
    /// `[a; b]` or `([] : t list)`
    List {
        /// Element type annotation.
        elem_ty: Option<Type>,
        /// Elements.
        items: Vec<E>,
    },
    /// `head :: tail`
    Cons {
        /// New first element.
        head: Box<E>,
        /// Existing list.
        tail: Box<E>,
    },
    /// `Some e`
    Some(Box<E>),
    /// `(None : t option)`, carrying the element type
    None(Type),
    /// `match scrutinee with None -> none | Some name -> some`
    MatchOption {
        /// Option being matched.
        scrutinee: Box<E>,
        /// Result when empty.
        none_branch: Box<E>,
        /// Name bound to the contents.
        some_name: String,
        /// Result when present.
        some_branch: Box<E>,
    },
    /// `{ a = 1; b = 2 }`
    Struct(Vec<(String, E)>),
    /// `root.p1.p2 <- value`
    UpdateStruct {
        /// Variable holding the struct.
        root: String,
        /// Field path, at least one segment.
        path: Vec<String>,
        /// New leaf value.
        value: Box<E>,
    },
    /// `callee(args)`
    Call {
        /// Function expression.
        callee: Box<E>,
        /// Arguments.
        args: Vec<E>,
    },
}

impl<A> ExprKind<A> {
    /// Rebuilds this node with every child mapped through `f`.
    pub fn map<B>(&self, mut f: impl FnMut(&A) -> B) -> ExprKind<B> {
        match self {
            Self::TopLevel(items) => ExprKind::TopLevel(items.iter().map(&mut f).collect()),
            Self::TypeDecl { name, ty } => ExprKind::TypeDecl {
                name: name.clone(),
                ty: ty.clone(),
            },
            Self::EntryDecl {
                name,
                params,
                storage,
                body,
            } => ExprKind::EntryDecl {
                name: name.clone(),
                params: params.clone(),
                storage: storage.clone(),
                body: Box::new(f(body)),
            },
            Self::StorageInit(e) => ExprKind::StorageInit(Box::new(f(e))),
            Self::Literal(lit) => ExprKind::Literal(lit.clone()),
            Self::Var(name) => ExprKind::Var(name.clone()),
            Self::ModuleAccess { module, field } => ExprKind::ModuleAccess {
                module: module.clone(),
                field: field.clone(),
            },
            Self::FieldAccess { target, field } => ExprKind::FieldAccess {
                target: Box::new(f(target)),
                field: field.clone(),
            },
            Self::BinOp { op, lhs, rhs } => ExprKind::BinOp {
                op: *op,
                lhs: Box::new(f(lhs)),
                rhs: Box::new(f(rhs)),
            },
            Self::Not(e) => ExprKind::Not(Box::new(f(e))),
            Self::Let {
                pattern,
                annotation,
                value,
                body,
            } => ExprKind::Let {
                pattern: pattern.clone(),
                annotation: annotation.clone(),
                value: Box::new(f(value)),
                body: Box::new(f(body)),
            },
            Self::If {
                cond,
                then_branch,
                else_branch,
            } => ExprKind::If {
                cond: Box::new(f(cond)),
                then_branch: Box::new(f(then_branch)),
                else_branch: else_branch.as_ref().map(|e| Box::new(f(e))),
            },
            Self::Sequence(items) => ExprKind::Sequence(items.iter().map(&mut f).collect()),
            Self::Tuple(items) => ExprKind::Tuple(items.iter().map(&mut f).collect()),
            Self::List { elem_ty, items } => ExprKind::List {
                elem_ty: elem_ty.clone(),
                items: items.iter().map(&mut f).collect(),
            },
            Self::Cons { head, tail } => ExprKind::Cons {
                head: Box::new(f(head)),
                tail: Box::new(f(tail)),
            },
            Self::Some(e) => ExprKind::Some(Box::new(f(e))),
            Self::None(ty) => ExprKind::None(ty.clone()),
            Self::MatchOption {
                scrutinee,
                none_branch,
                some_name,
                some_branch,
            } => ExprKind::MatchOption {
                scrutinee: Box::new(f(scrutinee)),
                none_branch: Box::new(f(none_branch)),
                some_name: some_name.clone(),
                some_branch: Box::new(f(some_branch)),
            },
            Self::Struct(fields) => ExprKind::Struct(
                fields
                    .iter()
                    .map(|(name, e)| (name.clone(), f(e)))
                    .collect(),
            ),
            Self::UpdateStruct { root, path, value } => ExprKind::UpdateStruct {
                root: root.clone(),
                path: path.clone(),
                value: Box::new(f(value)),
            },
            Self::Call { callee, args } => ExprKind::Call {
                callee: Box::new(f(callee)),
                args: args.iter().map(&mut f).collect(),
            },
        }
    }
}

impl<E> ExprKind<E> {
    /// Immediate children, in source order.
    #[must_use]
    pub fn children(&self) -> Vec<&E> {
        match self {
            Self::TopLevel(items) | Self::Sequence(items) | Self::Tuple(items) => {
                items.iter().collect()
            }
            Self::List { items, .. } => items.iter().collect(),
            Self::TypeDecl { .. }
            | Self::Literal(_)
            | Self::Var(_)
            | Self::ModuleAccess { .. }
            | Self::None(_) => Vec::new(),
            Self::EntryDecl { body: e, .. }
            | Self::StorageInit(e)
            | Self::FieldAccess { target: e, .. }
            | Self::Not(e)
            | Self::Some(e)
            | Self::UpdateStruct { value: e, .. } => vec![e.as_ref()],
            Self::BinOp { lhs, rhs, .. } => vec![lhs.as_ref(), rhs.as_ref()],
            Self::Let { value, body, .. } => vec![value.as_ref(), body.as_ref()],
            Self::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut out = vec![cond.as_ref(), then_branch.as_ref()];
                out.extend(else_branch.as_deref());
                out
            }
            Self::Cons { head, tail } => vec![head.as_ref(), tail.as_ref()],
            Self::MatchOption {
                scrutinee,
                none_branch,
                some_branch,
                ..
            } => vec![scrutinee.as_ref(), none_branch.as_ref(), some_branch.as_ref()],
            Self::Struct(fields) => fields.iter().map(|(_, e)| e).collect(),
            Self::Call { callee, args } => {
                let mut out = vec![callee.as_ref()];
                out.extend(args.iter());
                out
            }
        }
    }
}

// =============================================================================
// UNTYPED TREE
// =============================================================================

/// Untyped expression, as produced by the parser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Node.
    pub kind: ExprKind<Expr>,
}

impl From<ExprKind<Expr>> for Expr {
    fn from(kind: ExprKind<Expr>) -> Self {
        Self { kind }
    }
}

// Short constructors for building trees by hand.
impl Expr {
    /// Whole program.
    #[must_use]
    pub fn program(items: Vec<Expr>) -> Self {
        ExprKind::TopLevel(items).into()
    }

    /// `type name = ty`
    pub fn type_decl(name: impl Into<String>, ty: Type) -> Self {
        ExprKind::TypeDecl {
            name: name.into(),
            ty,
        }
        .into()
    }

    /// `let%entry name (params) (storage) = body`
    pub fn entry<S: Into<String>>(
        name: impl Into<String>,
        params: Vec<(S, Option<Type>)>,
        storage: Pattern,
        body: Expr,
    ) -> Self {
        ExprKind::EntryDecl {
            name: name.into(),
            params: params
                .into_iter()
                .map(|(name, ty)| Param {
                    name: name.into(),
                    ty,
                })
                .collect(),
            storage,
            body: Box::new(body),
        }
        .into()
    }

    /// `let%init storage = e`
    #[must_use]
    pub fn storage_init(e: Expr) -> Self {
        ExprKind::StorageInit(Box::new(e)).into()
    }

    /// Literal node.
    #[must_use]
    pub fn lit(literal: Literal) -> Self {
        ExprKind::Literal(literal).into()
    }

    /// `int` literal.
    #[must_use]
    pub fn int(i: i64) -> Self {
        Self::lit(Literal::Int(i))
    }

    /// `nat` literal.
    #[must_use]
    pub fn nat(n: u64) -> Self {
        Self::lit(Literal::Nat(n))
    }

    /// `koin` literal in base units.
    #[must_use]
    pub fn koin(units: u64) -> Self {
        Self::lit(Literal::Koin(units))
    }

    /// `string` literal.
    pub fn string(s: impl Into<String>) -> Self {
        Self::lit(Literal::String(s.into()))
    }

    /// `bool` literal.
    #[must_use]
    pub fn bool(b: bool) -> Self {
        Self::lit(Literal::Bool(b))
    }

    /// `()`
    #[must_use]
    pub fn unit() -> Self {
        Self::lit(Literal::Unit)
    }

    /// Variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        ExprKind::Var(name.into()).into()
    }

    /// `Module.field`
    pub fn module(module: impl Into<String>, field: impl Into<String>) -> Self {
        ExprKind::ModuleAccess {
            module: module.into(),
            field: field.into(),
        }
        .into()
    }

    /// `target.field`
    pub fn field(target: Expr, field: impl Into<String>) -> Self {
        ExprKind::FieldAccess {
            target: Box::new(target),
            field: field.into(),
        }
        .into()
    }

    /// Binary operation.
    #[must_use]
    pub fn binop(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        ExprKind::BinOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
        .into()
    }

    /// `let pattern = value in body`
    #[must_use]
    pub fn let_in(pattern: Pattern, value: Expr, body: Expr) -> Self {
        ExprKind::Let {
            pattern,
            annotation: None,
            value: Box::new(value),
            body: Box::new(body),
        }
        .into()
    }

    /// `let pattern : ty = value in body`
    #[must_use]
    pub fn let_in_annotated(pattern: Pattern, ty: Type, value: Expr, body: Expr) -> Self {
        ExprKind::Let {
            pattern,
            annotation: Some(ty),
            value: Box::new(value),
            body: Box::new(body),
        }
        .into()
    }

    /// `if cond then a else b`
    #[must_use]
    pub fn if_else(cond: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        ExprKind::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(else_branch)),
        }
        .into()
    }

    /// `(a, b, ...)`
    #[must_use]
    pub fn tuple(items: Vec<Expr>) -> Self {
        ExprKind::Tuple(items).into()
    }

    /// `[a; b]`
    #[must_use]
    pub fn list(elem_ty: Option<Type>, items: Vec<Expr>) -> Self {
        ExprKind::List { elem_ty, items }.into()
    }

    /// `{ a = 1; b = 2 }`
    pub fn record<S: Into<String>>(fields: Vec<(S, Expr)>) -> Self {
        ExprKind::Struct(
            fields
                .into_iter()
                .map(|(name, e)| (name.into(), e))
                .collect(),
        )
        .into()
    }

    /// `root.path <- value`
    pub fn update<S: Into<String>>(root: impl Into<String>, path: Vec<S>, value: Expr) -> Self {
        ExprKind::UpdateStruct {
            root: root.into(),
            path: path.into_iter().map(Into::into).collect(),
            value: Box::new(value),
        }
        .into()
    }

    /// `callee(args)`
    #[must_use]
    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        ExprKind::Call {
            callee: Box::new(callee),
            args,
        }
        .into()
    }
}

// =============================================================================
// TYPED TREE
// =============================================================================

/// Expression annotated with its inferred type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypedExpr {
    /// Node with typed children.
    pub kind: ExprKind<TypedExpr>,
    /// Inferred type, possibly `Error`.
    pub ty: Type,
}

impl TypedExpr {
    /// Pairs a node with its type.
    #[must_use]
    pub fn new(kind: ExprKind<TypedExpr>, ty: Type) -> Self {
        Self { kind, ty }
    }

    /// The tree returned when checking runs out of gas.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(
            ExprKind::TopLevel(Vec::new()),
            Type::error("ran out of gas"),
        )
    }

    /// Drops all annotations.
    #[must_use]
    pub fn erase(&self) -> Expr {
        Expr {
            kind: self.kind.map(TypedExpr::erase),
        }
    }

    /// First `Error`/`NotImplemented` found in a depth-first walk.
    #[must_use]
    pub fn find_error(&self) -> Option<String> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Some(message) = node.ty.find_error() {
                return Some(message);
            }
            let mut children = node.kind.children();
            children.reverse();
            stack.extend(children);
        }
        None
    }

    /// Looks up an entrypoint declaration in a checked program.
    #[must_use]
    pub fn entry(&self, entry: &str) -> Option<EntryView<'_>> {
        let ExprKind::TopLevel(items) = &self.kind else {
            return None;
        };
        items.iter().find_map(|item| match &item.kind {
            ExprKind::EntryDecl {
                name,
                params,
                storage,
                body,
            } if name == entry => Some(EntryView {
                params,
                storage,
                body,
                ty: &item.ty,
            }),
            _ => None,
        })
    }

    /// Storage initializer expression of a checked program.
    #[must_use]
    pub fn storage_init(&self) -> Option<&TypedExpr> {
        let ExprKind::TopLevel(items) = &self.kind else {
            return None;
        };
        items.iter().find_map(|item| match &item.kind {
            ExprKind::StorageInit(e) => Some(e.as_ref()),
            _ => None,
        })
    }

    /// Declared storage type of a checked program.
    #[must_use]
    pub fn storage_type(&self) -> Option<&Type> {
        let ExprKind::TopLevel(items) = &self.kind else {
            return None;
        };
        items.iter().find_map(|item| match &item.kind {
            ExprKind::TypeDecl { name, .. } if name == "storage" => Some(&item.ty),
            _ => None,
        })
    }
}

/// Borrowed parts of a checked entrypoint declaration.
#[derive(Clone, Copy, Debug)]
pub struct EntryView<'a> {
    /// Declared parameters.
    pub params: &'a [Param],
    /// Storage pattern.
    pub storage: &'a Pattern,
    /// Body.
    pub body: &'a TypedExpr,
    /// `Lambda(params ++ [storage] -> (operation list * storage))`.
    pub ty: &'a Type,
}

//! # Type Model
//!
//! The closed set of type descriptors known to the contract language and the
//! persistent environments the checker threads through a program.
//!
//! Struct types are identified structurally: two struct types are the same
//! type iff their ordered field-name sequences are identical. The checker
//! keeps one declared struct per sequence, so every well-typed struct
//! descriptor with a given sequence also carries the same field types.

use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// TYPE DESCRIPTOR
// =============================================================================

/// A type descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Int,
    /// Unsigned 64-bit natural.
    Nat,
    /// Boolean.
    Bool,
    /// Fixed-point currency, 5 decimal places.
    Koin,
    /// Public key (32 characters).
    Key,
    /// Account or contract address (32 characters).
    Address,
    /// Unit.
    Unit,
    /// Effect emitted by an entrypoint.
    Operation,
    /// `T option`.
    Option(Box<Type>),
    /// `T list`.
    List(Box<Type>),
    /// `(A * B * ...)`.
    Tuple(Vec<Type>),
    /// Record with ordered named fields.
    Struct(Vec<(String, Type)>),
    /// Built-in function.
    Lambda {
        /// Parameter types.
        params: Vec<Type>,
        /// Return type.
        ret: Box<Type>,
    },
    /// Reference to a declared type name, resolved by the checker.
    DeclaredAlias(String),
    /// Checked semantic error attached to a node.
    Error(String),
    /// Construct the checker does not support.
    NotImplemented,
}

impl Type {
    /// Shorthand for an error type.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// `T option`.
    #[must_use]
    pub fn option(inner: Type) -> Self {
        Self::Option(Box::new(inner))
    }

    /// `T list`.
    #[must_use]
    pub fn list(inner: Type) -> Self {
        Self::List(Box::new(inner))
    }

    /// `(operation list * storage)`, the shape every entrypoint returns.
    #[must_use]
    pub fn entry_result(storage: Type) -> Self {
        Self::Tuple(vec![Self::list(Self::Operation), storage])
    }

    /// Returns true if this is `Error` or `NotImplemented`.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_) | Self::NotImplemented)
    }

    /// First error message found anywhere inside this type, if any.
    #[must_use]
    pub fn find_error(&self) -> Option<String> {
        match self {
            Self::Error(message) => Some(message.clone()),
            Self::NotImplemented => Some("not implemented".to_string()),
            Self::Option(inner) | Self::List(inner) => inner.find_error(),
            Self::Tuple(items) => items.iter().find_map(Type::find_error),
            Self::Struct(fields) => fields.iter().find_map(|(_, ty)| ty.find_error()),
            Self::Lambda { params, ret } => params
                .iter()
                .find_map(Type::find_error)
                .or_else(|| ret.find_error()),
            _ => None,
        }
    }

    /// Returns true if values of this type support `=` and ordering.
    #[must_use]
    pub fn is_comparable(&self) -> bool {
        matches!(
            self,
            Self::String
                | Self::Int
                | Self::Nat
                | Self::Bool
                | Self::Koin
                | Self::Key
                | Self::Address
        )
    }

    /// Field names of a struct type, in declaration order.
    #[must_use]
    pub fn field_names(&self) -> Option<Vec<&str>> {
        match self {
            Self::Struct(fields) => Some(fields.iter().map(|(name, _)| name.as_str()).collect()),
            _ => None,
        }
    }

    /// Type of a struct field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Type> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, ty)| ty),
            _ => None,
        }
    }
}

/// Registry key of a struct type: its field names, in order.
#[must_use]
pub fn struct_key<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Nat => write!(f, "nat"),
            Self::Bool => write!(f, "bool"),
            Self::Koin => write!(f, "koin"),
            Self::Key => write!(f, "key"),
            Self::Address => write!(f, "address"),
            Self::Unit => write!(f, "unit"),
            Self::Operation => write!(f, "operation"),
            Self::Option(inner) => write!(f, "{inner} option"),
            Self::List(inner) => write!(f, "{inner} list"),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx != 0 {
                        write!(f, " * ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Struct(fields) => {
                write!(f, "{{")?;
                for (idx, (name, ty)) in fields.iter().enumerate() {
                    if idx != 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, "}}")
            }
            Self::Lambda { params, ret } => {
                write!(f, "(")?;
                for (idx, p) in params.iter().enumerate() {
                    if idx != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Self::DeclaredAlias(name) => write!(f, "{name}"),
            Self::Error(message) => write!(f, "<error: {message}>"),
            Self::NotImplemented => write!(f, "<not implemented>"),
        }
    }
}

// =============================================================================
// ENVIRONMENTS
// =============================================================================

/// Variable name to type.
pub type VarEnv = OrdMap<String, Type>;

/// Declared type name to resolved type.
pub type TypeEnv = OrdMap<String, Type>;

/// Struct registry key (see [`struct_key`]) to struct type.
pub type StructEnv = OrdMap<String, Type>;

/// The three environments threaded through checking.
///
/// Cloning is O(1) and a clone never observes bindings added to the
/// original afterwards, so a child scope is simply an extended clone.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    /// Variables in scope.
    pub vars: VarEnv,
    /// Declared type names.
    pub types: TypeEnv,
    /// Declared struct types by field sequence.
    pub structs: StructEnv,
}

impl Scope {
    /// Empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Child scope with `vars` replacing the variable environment.
    #[must_use]
    pub fn with_vars(&self, vars: VarEnv) -> Self {
        Self {
            vars,
            types: self.types.clone(),
            structs: self.structs.clone(),
        }
    }

    /// Child scope with one more variable bound.
    #[must_use]
    pub fn bind(&self, name: &str, ty: Type) -> Self {
        self.with_vars(self.vars.update(name.to_string(), ty))
    }
}

// =============================================================================
// TESTS
// =============================================================================

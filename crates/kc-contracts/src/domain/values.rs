//! # Value Model
//!
//! Runtime values. Every variant mirrors a [`Type`] and reports a storage
//! size used for rent accounting.

use crate::domain::builtins::Builtin;
use crate::domain::types::Type;
use crate::errors::ValueError;
use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Length of keys and addresses, in characters.
pub const KEY_LENGTH: usize = 32;

// =============================================================================
// VALUE
// =============================================================================

/// A runtime value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// String.
    StringVal(String),
    /// Signed integer.
    IntVal(i64),
    /// Natural.
    NatVal(u64),
    /// Boolean.
    BoolVal(bool),
    /// Koin, scaled by [`koin::SCALE`].
    KoinVal(u64),
    /// Key.
    KeyVal(String),
    /// Address.
    AddressVal(String),
    /// Unit.
    UnitVal,
    /// `Some(v)` or `None`.
    OptionVal(Option<Box<Value>>),
    /// List.
    ListVal(Vec<Value>),
    /// Tuple.
    TupleVal(Vec<Value>),
    /// Struct. Untouched fields are shared between versions.
    StructVal(OrdMap<String, Value>),
    /// Emitted effect.
    OperationVal(Operation),
    /// Reference to a built-in.
    LambdaVal(Builtin),
}

impl Value {
    /// Key value, validating its length.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidKey` if `key` is not [`KEY_LENGTH`] characters.
    pub fn key(key: impl Into<String>) -> Result<Self, ValueError> {
        let key = key.into();
        if key.chars().count() == KEY_LENGTH {
            Ok(Self::KeyVal(key))
        } else {
            Err(ValueError::InvalidKey(key))
        }
    }

    /// Address value, validating its length.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidAddress` if `address` is not [`KEY_LENGTH`] characters.
    pub fn address(address: impl Into<String>) -> Result<Self, ValueError> {
        let address = address.into();
        if address.chars().count() == KEY_LENGTH {
            Ok(Self::AddressVal(address))
        } else {
            Err(ValueError::InvalidAddress(address))
        }
    }

    /// Struct value from `(name, value)` pairs.
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self::StructVal(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Storage cost of this value.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::StringVal(s) | Self::KeyVal(s) | Self::AddressVal(s) => s.len() as u64,
            Self::IntVal(_) | Self::NatVal(_) | Self::KoinVal(_) | Self::LambdaVal(_) => 8,
            Self::BoolVal(_) | Self::UnitVal => 1,
            Self::OptionVal(inner) => 1 + inner.as_ref().map_or(0, |v| v.size()),
            Self::ListVal(items) | Self::TupleVal(items) => {
                items.iter().map(Value::size).sum::<u64>().max(1)
            }
            Self::StructVal(fields) => fields
                .iter()
                .map(|(name, value)| name.len() as u64 + value.size())
                .sum(),
            Self::OperationVal(op) => op.size(),
        }
    }

    /// Returns true if this value has the shape of `ty`.
    ///
    /// Used on values arriving from outside a checked program (call
    /// parameters, stored state handed back by a collaborator).
    #[must_use]
    pub fn conforms_to(&self, ty: &Type) -> bool {
        match (self, ty) {
            (Self::StringVal(_), Type::String)
            | (Self::IntVal(_), Type::Int)
            | (Self::NatVal(_), Type::Nat)
            | (Self::BoolVal(_), Type::Bool)
            | (Self::KoinVal(_), Type::Koin)
            | (Self::UnitVal, Type::Unit)
            | (Self::OperationVal(_), Type::Operation) => true,
            (Self::KeyVal(k), Type::Key) | (Self::AddressVal(k), Type::Address) => {
                k.chars().count() == KEY_LENGTH
            }
            (Self::OptionVal(inner), Type::Option(inner_ty)) => {
                inner.as_ref().map_or(true, |v| v.conforms_to(inner_ty))
            }
            (Self::ListVal(items), Type::List(item_ty)) => {
                items.iter().all(|v| v.conforms_to(item_ty))
            }
            (Self::TupleVal(items), Type::Tuple(types)) => {
                items.len() == types.len() && items.iter().zip(types).all(|(v, t)| v.conforms_to(t))
            }
            (Self::StructVal(values), Type::Struct(fields)) => {
                values.len() == fields.len()
                    && fields
                        .iter()
                        .all(|(name, t)| values.get(name).is_some_and(|v| v.conforms_to(t)))
            }
            (Self::LambdaVal(builtin), Type::Lambda { .. }) => {
                builtin.signature().is_some_and(|sig| &sig == ty)
            }
            _ => false,
        }
    }

    /// Ordering between two values of the same comparable primitive type.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::StringVal(a), Self::StringVal(b))
            | (Self::KeyVal(a), Self::KeyVal(b))
            | (Self::AddressVal(a), Self::AddressVal(b)) => Some(a.cmp(b)),
            (Self::IntVal(a), Self::IntVal(b)) => Some(a.cmp(b)),
            (Self::NatVal(a), Self::NatVal(b)) | (Self::KoinVal(a), Self::KoinVal(b)) => {
                Some(a.cmp(b))
            }
            (Self::BoolVal(a), Self::BoolVal(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringVal(s) => write!(f, "{s:?}"),
            Self::IntVal(i) => write!(f, "{i}"),
            Self::NatVal(n) => write!(f, "{n}p"),
            Self::BoolVal(b) => write!(f, "{b}"),
            Self::KoinVal(k) => write!(f, "{}tz", koin::format(*k)),
            Self::KeyVal(k) | Self::AddressVal(k) => write!(f, "{k}"),
            Self::UnitVal => write!(f, "()"),
            Self::OptionVal(None) => write!(f, "None"),
            Self::OptionVal(Some(v)) => write!(f, "Some({v})"),
            Self::ListVal(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx != 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::TupleVal(items) => {
                write!(f, "(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::StructVal(fields) => {
                write!(f, "{{")?;
                for (idx, (name, value)) in fields.iter().enumerate() {
                    if idx != 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{name} = {value}")?;
                }
                write!(f, "}}")
            }
            Self::OperationVal(op) => write!(f, "{op}"),
            Self::LambdaVal(builtin) => write!(f, "{builtin}"),
        }
    }
}

// =============================================================================
// OPERATION
// =============================================================================

/// Effect produced by an entrypoint call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// The call aborted.
    FailWith {
        /// Abort message.
        message: String,
    },
    /// Credit an external account.
    Transfer {
        /// Receiving key.
        key: String,
        /// Amount in Koin units.
        amount: u64,
    },
    /// Invoke another contract's entrypoint.
    ContractCall {
        /// Target contract address.
        address: String,
        /// Amount attached to the call.
        amount: u64,
        /// Entrypoint name.
        entry: String,
        /// Parameters.
        params: Box<Value>,
    },
}

impl Operation {
    /// Storage cost of this operation.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::FailWith { message } => message.len() as u64,
            Self::Transfer { key, .. } => key.len() as u64 + 8,
            Self::ContractCall {
                address,
                entry,
                params,
                ..
            } => address.len() as u64 + 8 + entry.len() as u64 + params.size(),
        }
    }

    /// Amount this operation takes out of the emitting contract.
    #[must_use]
    pub fn amount(&self) -> u64 {
        match self {
            Self::FailWith { .. } => 0,
            Self::Transfer { amount, .. } | Self::ContractCall { amount, .. } => *amount,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailWith { message } => write!(f, "FailWith({message:?})"),
            Self::Transfer { key, amount } => {
                write!(f, "Transfer({key}, {}tz)", koin::format(*amount))
            }
            Self::ContractCall {
                address,
                amount,
                entry,
                params,
            } => write!(
                f,
                "ContractCall({address}.{entry}, {}tz, {params})",
                koin::format(*amount)
            ),
        }
    }
}

// =============================================================================
// KOIN ENCODING
// =============================================================================

/// Koin fixed-point encoding: decimal with up to 5 fractional digits,
/// stored as an unsigned integer scaled by [`SCALE`](koin::SCALE).
pub mod koin {
    use crate::errors::ValueError;

    /// Number of fractional digits.
    pub const DECIMALS: usize = 5;
    /// One Koin in base units.
    pub const SCALE: u64 = 100_000;

    /// Parses a decimal literal such as `1.5` into base units.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidKoin` on malformed input, more than 5
    /// fractional digits, or overflow.
    pub fn parse(literal: &str) -> Result<u64, ValueError> {
        let invalid = || ValueError::InvalidKoin(literal.to_string());
        let (whole, fraction) = match literal.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (literal, ""),
        };
        if whole.is_empty()
            || fraction.len() > DECIMALS
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let mut units = 0u64;
        for digit in fraction.bytes().chain(std::iter::repeat(b'0')).take(DECIMALS) {
            units = units * 10 + u64::from(digit - b'0');
        }
        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(units))
            .ok_or_else(invalid)
    }

    /// Formats base units as a decimal without trailing zeros.
    #[must_use]
    pub fn format(units: u64) -> String {
        let whole = units / SCALE;
        let fraction = units % SCALE;
        if fraction == 0 {
            whole.to_string()
        } else {
            let digits = format!("{fraction:05}");
            format!("{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

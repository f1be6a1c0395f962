//! # Built-in Modules
//!
//! `Current`, `Account` and `Contract` members are opaque identifiers that
//! the checker types through [`Builtin::signature`] and the interpreter
//! dispatches at call sites.

use crate::domain::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A built-in module member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Builtin {
    /// `Current.balance : (unit) -> koin`
    CurrentBalance,
    /// `Current.amount : (unit) -> koin`
    CurrentAmount,
    /// `Current.gas : (unit) -> nat`
    CurrentGas,
    /// `Current.failwith : (string) -> unit`
    CurrentFailwith,
    /// `Account.transfer : (key, koin) -> operation`
    AccountTransfer,
    /// `Account.default : (key) -> address`
    AccountDefault,
    /// `Contract.call : (address, koin, string, 'p) -> operation`
    ContractCall,
}

impl Builtin {
    /// All built-ins.
    pub const ALL: [Builtin; 7] = [
        Self::CurrentBalance,
        Self::CurrentAmount,
        Self::CurrentGas,
        Self::CurrentFailwith,
        Self::AccountTransfer,
        Self::AccountDefault,
        Self::ContractCall,
    ];

    /// Resolves `module.field`.
    #[must_use]
    pub fn resolve(module: &str, field: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|builtin| builtin.path() == (module, field))
    }

    /// `(module, field)` this built-in is reachable under.
    #[must_use]
    pub fn path(self) -> (&'static str, &'static str) {
        match self {
            Self::CurrentBalance => ("Current", "balance"),
            Self::CurrentAmount => ("Current", "amount"),
            Self::CurrentGas => ("Current", "gas"),
            Self::CurrentFailwith => ("Current", "failwith"),
            Self::AccountTransfer => ("Account", "transfer"),
            Self::AccountDefault => ("Account", "default"),
            Self::ContractCall => ("Contract", "call"),
        }
    }

    /// Lambda type, or `None` for `Contract.call` whose parameter slot takes
    /// the type of the argument at each call site.
    #[must_use]
    pub fn signature(self) -> Option<Type> {
        let (params, ret) = match self {
            Self::CurrentBalance | Self::CurrentAmount => (vec![Type::Unit], Type::Koin),
            Self::CurrentGas => (vec![Type::Unit], Type::Nat),
            Self::CurrentFailwith => (vec![Type::String], Type::Unit),
            Self::AccountTransfer => (vec![Type::Key, Type::Koin], Type::Operation),
            Self::AccountDefault => (vec![Type::Key], Type::Address),
            Self::ContractCall => return None,
        };
        Some(Type::Lambda {
            params,
            ret: Box::new(ret),
        })
    }

    /// `Contract.call` signature instantiated with the parameter type.
    #[must_use]
    pub fn contract_call_signature(params_ty: Type) -> Type {
        Type::Lambda {
            params: vec![Type::Address, Type::Koin, Type::String, params_ty],
            ret: Box::new(Type::Operation),
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (module, field) = self.path();
        write!(f, "{module}.{field}")
    }
}

//! # Error Types
//!
//! All error types for contract checking, execution and orchestration.

use thiserror::Error;

// =============================================================================
// RUNTIME ABORTS
// =============================================================================

/// Reasons an entrypoint evaluation stops early.
///
/// Every abort is recovered at the entrypoint boundary and turned into a
/// `[FailWith(message)]` result, where the message is this error's display.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Abort {
    /// Gas budget exhausted.
    #[error("ran out of gas")]
    OutOfGas,

    /// Division or remainder by zero.
    #[error("Can't divide by zero!")]
    DivisionByZero,

    /// Koin subtraction below zero.
    #[error("koin subtraction underflow")]
    KoinUnderflow,

    /// 64-bit arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Outgoing operations exceed `balance + amount`.
    #[error("contract spendings exceed contract balance")]
    Overspend,

    /// `Current.failwith(message)`.
    #[error("{0}")]
    FailWith(String),

    /// Parameters or storage do not match the entrypoint's declared types.
    #[error("invalid parameters for entrypoint {0}")]
    InvalidParameters(String),

    /// Entrypoint not declared by the contract.
    #[error("unknown entrypoint: {0}")]
    UnknownEntry(String),

    /// Tree shape the checker should have rejected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Abort {
    /// Returns true if the contract itself chose to fail.
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::FailWith(_))
    }

    /// Returns true if this abort drains the remaining gas.
    #[must_use]
    pub fn consumes_all_gas(&self) -> bool {
        matches!(self, Self::OutOfGas)
    }
}

/// The checker's only abort: the gas budget would go negative.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("ran out of gas")]
pub struct OutOfGas;

impl From<OutOfGas> for Abort {
    fn from(_: OutOfGas) -> Self {
        Abort::OutOfGas
    }
}

// =============================================================================
// VALUE ERRORS
// =============================================================================

/// Malformed runtime values built outside a contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Key is not 32 characters.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Address is not 32 characters.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    /// Koin literal malformed or out of range.
    #[error("invalid koin literal: {0:?}")]
    InvalidKoin(String),
}

// =============================================================================
// PARSE ERRORS
// =============================================================================

/// Reported by the external source parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Source is not valid UTF-8.
    #[error("source is not valid UTF-8")]
    InvalidEncoding,

    /// Syntax error.
    #[error("syntax error: {0}")]
    Syntax(String),
}

// =============================================================================
// CONTRACT ERRORS
// =============================================================================

/// Errors returned by contract initiation and orchestrated calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Source could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Source exceeds the configured limit.
    #[error("code size exceeded: {size} > {max} bytes")]
    CodeTooLarge { size: usize, max: usize },

    /// Program failed semantic checking.
    #[error("type error: {0}")]
    TypeCheck(String),

    /// Gas ran out before the contract could be initiated.
    #[error("out of gas")]
    OutOfGas,

    /// Storage initializer aborted.
    #[error("storage initialization failed: {0}")]
    InitFailed(String),

    /// A contract with the same code is already registered.
    #[error("contract already deployed at {0}")]
    AlreadyDeployed(String),

    /// No contract at the address.
    #[error("contract not found: {0}")]
    NotFound(String),

    /// Some call in the chain failed; nothing was committed.
    #[error("call aborted: {message}")]
    Aborted { message: String, remaining_gas: u64 },

    /// Nested contract calls went too deep.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded { depth: u16, max: u16 },

    /// A balance would exceed the representable range.
    #[error("balance overflow at {0}")]
    BalanceOverflow(String),

    /// An entrypoint outcome broke a post-call invariant; nothing was committed.
    #[error("invariant violated at {address}: {violations}")]
    InvariantViolated { address: String, violations: String },
}

impl ContractError {
    /// Gas left when the error was raised, where meaningful.
    #[must_use]
    pub fn remaining_gas(&self) -> Option<u64> {
        match self {
            Self::Aborted { remaining_gas, .. } => Some(*remaining_gas),
            Self::OutOfGas => Some(0),
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

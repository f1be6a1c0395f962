//! # KC Contracts - Contract Language Engine
//!
//! Checks and runs contracts written in a small, statically typed, ML-style
//! language. The engine is gas-metered and deterministic.
//!
//! ## Pipeline
//!
//! | Stage | Location | Purpose |
//! |-------|----------|---------|
//! | Parse | `ports/outbound.rs` - `SourceParser` | Source text to untyped tree |
//! | Check | `checker/mod.rs` - `check()` | Annotate types, report first error |
//! | Initialize | `vm/interpreter.rs` - `init_storage()` | Evaluate the storage initializer |
//! | Call | `vm/interpreter.rs` - `call_entry()` | Run one entrypoint |
//! | Orchestrate | `service.rs` - `ContractService` | Resolve call chains, commit atomically |
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Gas never increases | `domain/invariants.rs` - `check_gas_invariant()` |
//! | Failed calls have no effects | `domain/invariants.rs` - `check_failure_invariant()` |
//! | Spending stays within balance plus amount | `domain/invariants.rs` - `check_spending_invariant()` |
//! | Storage keeps its declared type | `domain/invariants.rs` - `check_storage_type_invariant()` |
//! | Call depth limit | `domain/invariants.rs` - `check_call_depth_invariant()` |
//!
//! ## Gas Costs
//!
//! | Step | Cost |
//! |------|------|
//! | Checker node | 1000 |
//! | Evaluation step | 1000 |
//! | Contract initiation | 100 000 |
//! | Nested contract call | 1000 |
//!
//! ## Usage Example
//!
//! ```ignore
//! use kc_contracts::prelude::*;
//!
//! let service = ContractService::new(parser, InMemoryRegistry::new(), ServiceConfig::default());
//! let deployment = service.initiate(code, 1_000_000).await?;
//! let receipt = service
//!     .call(CallRequest::main(&deployment.address, Value::NatVal(1), 1_000_000))
//!     .await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod checker;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod ports;
pub mod service;
pub mod vm;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Syntax trees
    pub use crate::domain::ast::{BinOp, Expr, ExprKind, Literal, Param, Pattern, TypedExpr};

    // Types and values
    pub use crate::domain::types::{struct_key, Scope, Type};
    pub use crate::domain::values::{koin, Operation, Value, KEY_LENGTH};
    pub use crate::domain::builtins::Builtin;

    // Domain entities
    pub use crate::domain::entities::{
        CallOutcome, CallReceipt, Contract, EngineConfig, EntryCall, InitiatedContract,
        Registry, Transfer,
    };

    // Domain services
    pub use crate::domain::services::{contract_address, keccak256};

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };

    // Checker and interpreter
    pub use crate::checker::{check, Checked, MAIN_ENTRY, STORAGE_TYPE};
    pub use crate::engine::{initiate_contract, interpret_contract_call};
    pub use crate::vm::{call_entry, costs, init_storage, GasMeter};

    // Ports
    pub use crate::ports::inbound::{CallRequest, ContractEngineApi, Deployment};
    pub use crate::ports::outbound::{RegistryStore, SourceParser};

    // Errors
    pub use crate::errors::{Abort, ContractError, OutOfGas, ParseError, ValueError};

    // Adapters
    pub use crate::adapters::{FixtureParser, InMemoryRegistry};

    // Service
    pub use crate::service::{ContractService, ServiceConfig, ServiceStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================

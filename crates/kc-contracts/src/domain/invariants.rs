//! # Domain Invariants
//!
//! Properties every entrypoint outcome must satisfy. The orchestrator checks
//! them after each call when `verify_invariants` is enabled.

use crate::domain::ast::TypedExpr;
use crate::domain::entities::{CallOutcome, EngineConfig, EntryCall};

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Gas never increases across a call.
#[must_use]
pub fn check_gas_invariant(call: &EntryCall, outcome: &CallOutcome) -> bool {
    outcome.remaining_gas <= call.gas
}

/// A failed call has no effect: exactly one `FailWith`, the input storage,
/// and nothing spent.
#[must_use]
pub fn check_failure_invariant(call: &EntryCall, outcome: &CallOutcome) -> bool {
    if outcome.is_failure() {
        outcome.storage == call.storage && outcome.spent == 0
    } else {
        true
    }
}

/// Spending matches the emitted operations and never exceeds what the
/// contract holds plus what it received.
#[must_use]
pub fn check_spending_invariant(call: &EntryCall, outcome: &CallOutcome) -> bool {
    let emitted: u128 = outcome
        .operations
        .iter()
        .map(|op| u128::from(op.amount()))
        .sum();
    let available = u128::from(call.balance) + u128::from(call.amount);
    emitted == u128::from(outcome.spent) && emitted <= available
}

/// The new storage still has the declared storage type.
#[must_use]
pub fn check_storage_type_invariant(program: &TypedExpr, outcome: &CallOutcome) -> bool {
    program
        .storage_type()
        .is_some_and(|ty| outcome.storage.conforms_to(ty))
}

/// Nested calls stay within the configured depth.
#[must_use]
pub fn check_call_depth_invariant(depth: u16, config: &EngineConfig) -> bool {
    depth <= config.max_call_depth
}

/// Checks all outcome invariants at once.
#[must_use]
pub fn check_all_invariants(
    program: &TypedExpr,
    call: &EntryCall,
    outcome: &CallOutcome,
) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_gas_invariant(call, outcome) {
        violations.push(InvariantViolation::GasIncreased {
            before: call.gas,
            after: outcome.remaining_gas,
        });
    }

    if !check_failure_invariant(call, outcome) {
        violations.push(InvariantViolation::FailureHadEffects {
            spent: outcome.spent,
        });
    }

    if !check_spending_invariant(call, outcome) {
        violations.push(InvariantViolation::Overspent {
            spent: outcome.spent,
            available: call.balance.saturating_add(call.amount),
        });
    }

    if !check_storage_type_invariant(program, outcome) {
        violations.push(InvariantViolation::StorageTypeChanged);
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Remaining gas exceeds the budget.
    GasIncreased { before: u64, after: u64 },
    /// A failed call changed storage or spent Koin.
    FailureHadEffects { spent: u64 },
    /// Operations spend more than reported, or more than available.
    Overspent { spent: u64, available: u64 },
    /// Storage no longer conforms to the declared type.
    StorageTypeChanged,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GasIncreased { before, after } => {
                write!(f, "gas increased: {before} -> {after}")
            }
            Self::FailureHadEffects { spent } => {
                write!(f, "failed call had effects: spent {spent}")
            }
            Self::Overspent { spent, available } => {
                write!(f, "spending inconsistent: spent {spent}, available {available}")
            }
            Self::StorageTypeChanged => write!(f, "storage no longer matches its type"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

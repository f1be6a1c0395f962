//! # Gas Metering
//!
//! Fixed step costs and the budget counter threaded through checking and
//! evaluation. The counter only ever decreases.

use crate::errors::OutOfGas;

// =============================================================================
// BASE GAS COSTS
// =============================================================================

/// Gas costs.
pub mod costs {
    /// One checker step: a node, a type translation, a pattern, a parameter.
    pub const CHECK_STEP: u64 = 1000;
    /// One interpreter step.
    pub const EVAL_STEP: u64 = 1000;
    /// Contract initiation, paid before parsing.
    pub const INIT: u64 = 100_000;
    /// Resolving one nested contract call.
    pub const CALL: u64 = 1000;
}

// =============================================================================
// GAS METER
// =============================================================================

/// Gas budget for one check or one call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    remaining: u64,
}

impl GasMeter {
    /// Meter with the full budget available.
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }

    /// Pays `amount` up front.
    ///
    /// # Errors
    ///
    /// Returns `OutOfGas` and drains the meter if the budget would go negative.
    pub fn charge(&mut self, amount: u64) -> Result<(), OutOfGas> {
        if amount > self.remaining {
            self.remaining = 0;
            Err(OutOfGas)
        } else {
            self.remaining -= amount;
            Ok(())
        }
    }

    /// Gas left.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Gas spent so far.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.limit - self.remaining
    }
}

// =============================================================================
// TESTS
// =============================================================================

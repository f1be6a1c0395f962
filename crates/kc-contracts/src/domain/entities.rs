//! # Core Domain Entities
//!
//! Deployed contracts, call inputs and outputs, and engine limits.

use crate::domain::ast::TypedExpr;
use crate::domain::values::{Operation, Value};
use crate::errors::ContractError;
use im::OrdMap;
use serde::{Deserialize, Serialize};

// =============================================================================
// CONTRACT
// =============================================================================

/// A deployed contract.
///
/// Created by initiation; afterwards only committed calls replace its
/// storage. Balances are kept in a separate ledger keyed by address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Content address derived from `code`.
    pub address: String,
    /// Original source bytes.
    pub code: Vec<u8>,
    /// Checked program.
    pub program: TypedExpr,
    /// Current storage.
    pub storage: Value,
    /// Slot of the last committed call that touched this contract.
    pub last_slot: Option<u64>,
}

impl Contract {
    /// Storage cost of the current storage value.
    #[must_use]
    pub fn storage_size(&self) -> u64 {
        self.storage.size()
    }
}

/// Result of initiating a contract, before it is registered anywhere.
#[derive(Clone, Debug, PartialEq)]
pub struct InitiatedContract {
    /// Content address.
    pub address: String,
    /// Checked program.
    pub program: TypedExpr,
    /// Value produced by the storage initializer.
    pub storage: Value,
    /// Gas left.
    pub remaining_gas: u64,
}

// =============================================================================
// ENTRYPOINT CALLS
// =============================================================================

/// Inputs of one entrypoint invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryCall {
    /// Entrypoint name.
    pub entry: String,
    /// Parameters: unit, a single value, or a tuple for several parameters.
    pub params: Value,
    /// Storage before the call.
    pub storage: Value,
    /// Koin attached to the call.
    pub amount: u64,
    /// Contract balance before the call.
    pub balance: u64,
    /// Gas budget.
    pub gas: u64,
}

impl EntryCall {
    /// Call of `entry` with no Koin attached and an empty balance.
    pub fn new(entry: impl Into<String>, params: Value, storage: Value, gas: u64) -> Self {
        Self {
            entry: entry.into(),
            params,
            storage,
            amount: 0,
            balance: 0,
            gas,
        }
    }

    /// Attaches `amount` to the call.
    #[must_use]
    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    /// Sets the contract balance seen by the call.
    #[must_use]
    pub fn with_balance(mut self, balance: u64) -> Self {
        self.balance = balance;
        self
    }
}

/// Outputs of one entrypoint invocation.
///
/// A failed call is a normal outcome: `operations` is exactly
/// `[FailWith(message)]`, `storage` is the input storage and `spent` is 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    /// Emitted operations.
    pub operations: Vec<Operation>,
    /// Storage after the call.
    pub storage: Value,
    /// Koin committed to outgoing operations.
    pub spent: u64,
    /// Gas left.
    pub remaining_gas: u64,
}

impl CallOutcome {
    /// Failure outcome.
    pub fn failure(message: impl Into<String>, storage: Value, remaining_gas: u64) -> Self {
        Self {
            operations: vec![Operation::FailWith {
                message: message.into(),
            }],
            storage,
            spent: 0,
            remaining_gas,
        }
    }

    /// Abort message if the call failed.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        match self.operations.as_slice() {
            [Operation::FailWith { message }] => Some(message),
            _ => None,
        }
    }

    /// Returns true if the call failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.failure_message().is_some()
    }
}

// =============================================================================
// ORCHESTRATED CALLS
// =============================================================================

/// Koin credited to an external account by a committed call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Receiving key.
    pub to: String,
    /// Amount in Koin units.
    pub amount: u64,
}

/// Result of a committed call chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallReceipt {
    /// Contract balances after the commit.
    pub balances: OrdMap<String, u64>,
    /// External transfers, in emission order.
    pub transfers: Vec<Transfer>,
    /// Gas left.
    pub remaining_gas: u64,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Deployed contracts and their balances.
///
/// Both maps are persistent: cloning a registry is O(1) and the clone shares
/// structure with the original until one of them changes. A call works on a
/// clone and is committed by replacing the original wholesale.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registry {
    /// Contracts by address.
    pub contracts: OrdMap<String, Contract>,
    /// Contract balances by address.
    pub balances: OrdMap<String, u64>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contract at `address`.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::NotFound` if nothing is deployed there.
    pub fn contract(&self, address: &str) -> Result<&Contract, ContractError> {
        self.contracts
            .get(address)
            .ok_or_else(|| ContractError::NotFound(address.to_string()))
    }

    /// Balance of `address`, 0 if unknown.
    #[must_use]
    pub fn balance(&self, address: &str) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Registers a new contract with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::AlreadyDeployed` if the address is taken.
    pub fn deploy(&mut self, contract: Contract) -> Result<(), ContractError> {
        if self.contracts.contains_key(&contract.address) {
            return Err(ContractError::AlreadyDeployed(contract.address));
        }
        self.balances.insert(contract.address.clone(), 0);
        self.contracts.insert(contract.address.clone(), contract);
        Ok(())
    }

    /// Records the effects of a successful entrypoint call on `address`:
    /// new storage, `balance + amount - spent`, and the touching slot.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::NotFound` for an unknown address and
    /// `ContractError::BalanceOverflow` if the balance leaves the `u64` range.
    pub fn apply_outcome(
        &mut self,
        address: &str,
        amount: u64,
        outcome: &CallOutcome,
        slot: u64,
    ) -> Result<(), ContractError> {
        let balance = self
            .balance(address)
            .checked_add(amount)
            .and_then(|b| b.checked_sub(outcome.spent))
            .ok_or_else(|| ContractError::BalanceOverflow(address.to_string()))?;
        let mut contract = self.contract(address)?.clone();
        contract.storage = outcome.storage.clone();
        contract.last_slot = Some(slot);
        self.contracts.insert(address.to_string(), contract);
        self.balances.insert(address.to_string(), balance);
        Ok(())
    }
}

// =============================================================================
// ENGINE CONFIGURATION
// =============================================================================

/// Engine limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum nesting of contract-to-contract calls (default: 64).
    pub max_call_depth: u16,
    /// Maximum source size in bytes (default: 64 KiB).
    pub max_code_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 64,
            max_code_size: 64 * 1024,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

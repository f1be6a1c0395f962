//! # Driving Ports (API - Inbound)
//!
//! The interface ledger components use to deploy and call contracts.

use crate::domain::entities::CallReceipt;
use crate::domain::values::Value;
use crate::errors::ContractError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// =============================================================================
// REQUESTS AND RESPONSES
// =============================================================================

/// A top-level contract call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Target contract.
    pub address: String,
    /// Entrypoint name.
    pub entry: String,
    /// Parameters.
    pub params: Value,
    /// Koin attached by the caller.
    pub amount: u64,
    /// Gas budget for the whole call chain.
    pub gas: u64,
    /// Slot the call is included in.
    pub slot: u64,
}

impl CallRequest {
    /// Call of `main` with no Koin attached.
    pub fn main(address: impl Into<String>, params: Value, gas: u64) -> Self {
        Self {
            address: address.into(),
            entry: "main".into(),
            params,
            amount: 0,
            gas,
            slot: 0,
        }
    }

    /// Attaches `amount` to the call.
    #[must_use]
    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    /// Sets the inclusion slot.
    #[must_use]
    pub fn at_slot(mut self, slot: u64) -> Self {
        self.slot = slot;
        self
    }
}

/// A successful deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    /// Content address of the new contract.
    pub address: String,
    /// Gas left.
    pub remaining_gas: u64,
}

// =============================================================================
// CONTRACT ENGINE API (Primary Driving Port)
// =============================================================================

/// Primary API for contract deployment and execution.
///
/// ## Usage
///
/// ```ignore
/// let deployment = api.initiate(code, 1_000_000).await?;
/// let receipt = api.call(CallRequest::main(deployment.address, params, gas)).await?;
/// ```
#[async_trait]
pub trait ContractEngineApi: Send + Sync {
    /// Parses, checks and initializes a contract, then registers it with a
    /// zero balance.
    ///
    /// # Errors
    ///
    /// Returns `ContractError` if any stage fails or the contract already
    /// exists; nothing is registered in that case.
    async fn initiate(&self, code: &[u8], gas: u64) -> Result<Deployment, ContractError>;

    /// Runs an entrypoint and every nested contract call it emits, then
    /// commits all of them or none.
    ///
    /// # Errors
    ///
    /// Returns `ContractError` if any call in the chain fails; the registry
    /// is left untouched.
    async fn call(&self, request: CallRequest) -> Result<CallReceipt, ContractError>;

    /// Current storage of a contract.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::NotFound` for an unknown address.
    async fn storage(&self, address: &str) -> Result<Value, ContractError>;

    /// Current balance of a contract.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::NotFound` for an unknown address.
    async fn balance(&self, address: &str) -> Result<u64, ContractError>;

    /// Storage cost of a contract's current storage, for rent accounting.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::NotFound` for an unknown address.
    async fn storage_size(&self, address: &str) -> Result<u64, ContractError>;

    /// Number of deployed contracts.
    async fn contract_count(&self) -> usize;
}

//! # Contract Service
//!
//! Orchestrator owning the contract registry. Deploys contracts and runs call
//! chains with all-or-nothing commit semantics.
//!
//! ## Transactions
//!
//! A call loads a snapshot of the registry, runs the target entrypoint,
//! resolves every emitted `ContractCall` depth-first against the snapshot,
//! and stores the snapshot back only if the whole chain succeeded. Writers
//! are serialized, so at most one call is between load and store at a time.

use crate::domain::entities::{
    CallReceipt, Contract, EngineConfig, EntryCall, Registry, Transfer,
};
use crate::domain::invariants::{check_all_invariants, check_call_depth_invariant, InvariantCheckResult};
use crate::domain::values::{Operation, Value};
use crate::engine::{initiate_contract, interpret_contract_call};
use crate::errors::ContractError;
use crate::ports::inbound::{CallRequest, ContractEngineApi, Deployment};
use crate::ports::outbound::{RegistryStore, SourceParser};
use crate::vm::gas::costs;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Contract service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Engine limits.
    pub engine: EngineConfig,
    /// Check outcome invariants after every entrypoint call.
    pub verify_invariants: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            verify_invariants: true,
        }
    }
}

/// Statistics for the contract service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Contracts deployed.
    pub contracts_deployed: u64,
    /// Call chains committed.
    pub calls_committed: u64,
    /// Call chains rolled back.
    pub calls_rolled_back: u64,
    /// Entrypoint invocations, nested ones included.
    pub entrypoint_invocations: u64,
    /// Total gas consumed by deployments and calls.
    pub total_gas_used: u64,
    /// Invariant violations detected.
    pub invariant_violations: u64,
}

/// Bookkeeping for one call chain.
#[derive(Debug, Default)]
struct ChainTrace {
    transfers: Vec<Transfer>,
    invocations: u64,
    violations: u64,
}

/// One pending entrypoint invocation in a chain.
struct Invocation {
    address: String,
    entry: String,
    params: Value,
    amount: u64,
    gas: u64,
    depth: u16,
}

/// The contract orchestrator.
pub struct ContractService<P: SourceParser, S: RegistryStore> {
    /// Service configuration.
    config: ServiceConfig,
    /// Source parser.
    parser: Arc<P>,
    /// Registry store.
    store: Arc<S>,
    /// Serializes registry writers.
    writer: Mutex<()>,
    /// Service statistics.
    stats: Arc<RwLock<ServiceStats>>,
}

impl<P: SourceParser, S: RegistryStore> ContractService<P, S> {
    /// Create a new contract service.
    pub fn new(parser: P, store: S, config: ServiceConfig) -> Self {
        Self {
            config,
            parser: Arc::new(parser),
            store: Arc::new(store),
            writer: Mutex::new(()),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Snapshot of the registry.
    pub async fn registry(&self) -> Registry {
        self.store.load().await
    }

    #[instrument(skip(self, code), fields(code_len = code.len()))]
    async fn initiate_internal(&self, code: &[u8], gas: u64) -> Result<Deployment, ContractError> {
        let initiated = initiate_contract(self.parser.as_ref(), code, gas, &self.config.engine)
            .map_err(|err| {
                warn!(error = %err, "contract initiation failed");
                err
            })?;

        let _guard = self.writer.lock().await;
        let mut registry = self.store.load().await;
        registry.deploy(Contract {
            address: initiated.address.clone(),
            code: code.to_vec(),
            program: initiated.program,
            storage: initiated.storage,
            last_slot: None,
        })?;
        self.store.store(registry).await;

        {
            let mut stats = self.stats.write().await;
            stats.contracts_deployed += 1;
            stats.total_gas_used += gas.saturating_sub(initiated.remaining_gas);
        }

        info!(
            address = %initiated.address,
            remaining_gas = initiated.remaining_gas,
            "contract deployed"
        );
        Ok(Deployment {
            address: initiated.address,
            remaining_gas: initiated.remaining_gas,
        })
    }

    #[instrument(skip(self, request), fields(address = %request.address, entry = %request.entry))]
    async fn call_internal(&self, request: CallRequest) -> Result<CallReceipt, ContractError> {
        let _guard = self.writer.lock().await;
        let mut working = self.store.load().await;
        let mut trace = ChainTrace::default();

        let result = self.resolve(
            &mut working,
            &mut trace,
            Invocation {
                address: request.address,
                entry: request.entry,
                params: request.params,
                amount: request.amount,
                gas: request.gas,
                depth: 0,
            },
            request.slot,
        );

        // The stats lock is never held across the store.
        if result.is_ok() {
            self.store.store(working.clone()).await;
        }

        let mut stats = self.stats.write().await;
        stats.entrypoint_invocations += trace.invocations;
        stats.invariant_violations += trace.violations;

        match result {
            Ok(remaining_gas) => {
                stats.calls_committed += 1;
                stats.total_gas_used += request.gas.saturating_sub(remaining_gas);
                info!(
                    remaining_gas,
                    transfers = trace.transfers.len(),
                    invocations = trace.invocations,
                    "call committed"
                );
                Ok(CallReceipt {
                    balances: working.balances,
                    transfers: trace.transfers,
                    remaining_gas,
                })
            }
            Err(err) => {
                stats.calls_rolled_back += 1;
                stats.total_gas_used += request
                    .gas
                    .saturating_sub(err.remaining_gas().unwrap_or(request.gas));
                warn!(error = %err, "call rolled back");
                Err(err)
            }
        }
    }

    /// Runs one invocation against `registry` and resolves its operations.
    ///
    /// Returns the gas left after the whole subtree.
    fn resolve(
        &self,
        registry: &mut Registry,
        trace: &mut ChainTrace,
        invocation: Invocation,
        slot: u64,
    ) -> Result<u64, ContractError> {
        if !check_call_depth_invariant(invocation.depth, &self.config.engine) {
            return Err(ContractError::CallDepthExceeded {
                depth: invocation.depth,
                max: self.config.engine.max_call_depth,
            });
        }

        let contract = registry.contract(&invocation.address)?;
        let call = EntryCall {
            entry: invocation.entry,
            params: invocation.params,
            storage: contract.storage.clone(),
            amount: invocation.amount,
            balance: registry.balance(&invocation.address),
            gas: invocation.gas,
        };
        let outcome = interpret_contract_call(&contract.program, &call);
        trace.invocations += 1;

        if self.config.verify_invariants {
            if let InvariantCheckResult::Invalid(violations) =
                check_all_invariants(&contract.program, &call, &outcome)
            {
                for violation in &violations {
                    error!(address = %invocation.address, %violation, "invariant violated");
                }
                trace.violations += violations.len() as u64;
                return Err(ContractError::InvariantViolated {
                    address: invocation.address,
                    violations: violations
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; "),
                });
            }
        }

        if let Some(message) = outcome.failure_message() {
            return Err(ContractError::Aborted {
                message: message.to_string(),
                remaining_gas: outcome.remaining_gas,
            });
        }

        registry.apply_outcome(&invocation.address, invocation.amount, &outcome, slot)?;

        let mut gas = outcome.remaining_gas;
        for operation in outcome.operations {
            match operation {
                Operation::Transfer { key, amount } => {
                    debug!(to = %key, amount, "transfer emitted");
                    trace.transfers.push(Transfer { to: key, amount });
                }
                Operation::ContractCall {
                    address,
                    amount,
                    entry,
                    params,
                } => {
                    gas = gas
                        .checked_sub(costs::CALL)
                        .ok_or(ContractError::OutOfGas)?;
                    debug!(%address, %entry, amount, depth = invocation.depth + 1, "resolving nested call");
                    gas = self.resolve(
                        registry,
                        trace,
                        Invocation {
                            address,
                            entry,
                            params: *params,
                            amount,
                            gas,
                            depth: invocation.depth + 1,
                        },
                        slot,
                    )?;
                }
                Operation::FailWith { message } => {
                    return Err(ContractError::Aborted {
                        message,
                        remaining_gas: gas,
                    });
                }
            }
        }
        Ok(gas)
    }
}

// =============================================================================
// API IMPLEMENTATION
// =============================================================================

#[async_trait]
impl<P: SourceParser, S: RegistryStore> ContractEngineApi for ContractService<P, S> {
    async fn initiate(&self, code: &[u8], gas: u64) -> Result<Deployment, ContractError> {
        self.initiate_internal(code, gas).await
    }

    async fn call(&self, request: CallRequest) -> Result<CallReceipt, ContractError> {
        self.call_internal(request).await
    }

    async fn storage(&self, address: &str) -> Result<Value, ContractError> {
        let registry = self.store.load().await;
        Ok(registry.contract(address)?.storage.clone())
    }

    async fn balance(&self, address: &str) -> Result<u64, ContractError> {
        let registry = self.store.load().await;
        registry.contract(address)?;
        Ok(registry.balance(address))
    }

    async fn storage_size(&self, address: &str) -> Result<u64, ContractError> {
        let registry = self.store.load().await;
        Ok(registry.contract(address)?.storage_size())
    }

    async fn contract_count(&self) -> usize {
        self.store.load().await.contracts.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

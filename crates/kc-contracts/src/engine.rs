//! # Engine API
//!
//! The two stateless entry points other ledger components call:
//! initiating a contract from source, and interpreting one entrypoint call
//! against a checked program. Neither touches any registry.

use crate::checker::check;
use crate::domain::ast::TypedExpr;
use crate::domain::entities::{CallOutcome, EngineConfig, EntryCall, InitiatedContract};
use crate::domain::services::contract_address;
use crate::errors::ContractError;
use crate::ports::outbound::SourceParser;
use crate::vm::gas::{costs, GasMeter};
use crate::vm::interpreter::{call_entry, init_storage};
use tracing::debug;

/// Parses, checks and initializes a contract.
///
/// Pays [`costs::INIT`] before anything else, then hands the remaining gas
/// to the checker and the storage initializer in turn.
///
/// # Errors
///
/// - `OutOfGas` if the budget runs out at any stage
/// - `CodeTooLarge` if `code` exceeds `config.max_code_size`
/// - `Parse` if the parser rejects the source
/// - `TypeCheck` with the first error if checking fails
/// - `InitFailed` if the storage initializer aborts
pub fn initiate_contract<P>(
    parser: &P,
    code: &[u8],
    gas: u64,
    config: &EngineConfig,
) -> Result<InitiatedContract, ContractError>
where
    P: SourceParser + ?Sized,
{
    let mut meter = GasMeter::new(gas);
    meter
        .charge(costs::INIT)
        .map_err(|_| ContractError::OutOfGas)?;

    if code.len() > config.max_code_size {
        return Err(ContractError::CodeTooLarge {
            size: code.len(),
            max: config.max_code_size,
        });
    }

    let tree = parser.parse(code)?;
    let checked = check(&tree, meter.remaining());
    if checked.ran_out_of_gas() {
        return Err(ContractError::OutOfGas);
    }
    if !checked.ok {
        let message = checked
            .error
            .unwrap_or_else(|| "program rejected".to_string());
        return Err(ContractError::TypeCheck(message));
    }

    let (storage, remaining_gas) =
        init_storage(&checked.program, checked.remaining_gas).map_err(|abort| {
            if abort.consumes_all_gas() {
                ContractError::OutOfGas
            } else {
                ContractError::InitFailed(abort.to_string())
            }
        })?;

    let address = contract_address(code);
    debug!(%address, remaining_gas, "contract initiated");
    Ok(InitiatedContract {
        address,
        program: checked.program,
        storage,
        remaining_gas,
    })
}

/// Runs one entrypoint of a checked program. Never fails; see
/// [`call_entry`].
#[must_use]
pub fn interpret_contract_call(program: &TypedExpr, call: &EntryCall) -> CallOutcome {
    call_entry(program, call)
}

// =============================================================================
// TESTS
// =============================================================================

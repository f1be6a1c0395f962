//! # Crowdfunding Scenario
//!
//! The fundme contract raises Koin towards a goal and refunds the excess.
//! Checked once at the engine API with explicit balances, once through the
//! orchestrator where balances come from the registry.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use kc_contracts::prelude::*;

    fn initiated() -> InitiatedContract {
        let parser = parser_with(vec![(FUNDME, fundme())]);
        initiate_contract(&parser, FUNDME.as_bytes(), GAS, &EngineConfig::default())
            .expect("fundme checks and initializes")
    }

    fn fund(
        contract: &InitiatedContract,
        storage: Value,
        amount: u64,
        balance: u64,
    ) -> CallOutcome {
        let call = EntryCall::new(MAIN_ENTRY, Value::KeyVal(key('k')), storage, GAS)
            .with_amount(amount)
            .with_balance(balance);
        interpret_contract_call(&contract.program, &call)
    }

    // =========================================================================
    // ENGINE API
    // =========================================================================

    #[test]
    fn test_initial_storage() {
        let contract = initiated();
        assert_eq!(contract.storage, fundme_value(0));
        assert_eq!(contract.address, address_of(FUNDME));
        assert!(contract.remaining_gas < GAS - costs::INIT);
    }

    #[test]
    fn test_fundme_accumulates_then_refunds_excess() {
        let contract = initiated();

        let first = fund(&contract, contract.storage.clone(), 900_000, 0);
        assert!(first.operations.is_empty());
        assert_eq!(first.storage, fundme_value(900_000));
        assert_eq!(first.spent, 0);

        let second = fund(&contract, first.storage, 500_000, 1_000_000);
        assert_eq!(second.storage, fundme_value(FUNDING_GOAL));
        assert_eq!(
            second.operations,
            vec![Operation::Transfer {
                key: key('k'),
                amount: 400_000,
            }]
        );
        assert_eq!(second.spent, 400_000);
        assert!(second.remaining_gas < GAS);
    }

    #[test]
    fn test_exact_goal_needs_no_refund() {
        let contract = initiated();
        let outcome = fund(&contract, contract.storage.clone(), FUNDING_GOAL, 0);
        assert!(outcome.operations.is_empty());
        assert_eq!(outcome.storage, fundme_value(FUNDING_GOAL));
    }

    #[test]
    fn test_short_key_is_rejected_at_entry() {
        let contract = initiated();
        let call = EntryCall::new(
            MAIN_ENTRY,
            Value::KeyVal("short".into()),
            contract.storage.clone(),
            GAS,
        );
        let outcome = interpret_contract_call(&contract.program, &call);
        assert_eq!(
            outcome.failure_message(),
            Some("invalid parameters for entrypoint main")
        );
        assert_eq!(outcome.storage, contract.storage);
        assert_eq!(outcome.spent, 0);
    }

    // =========================================================================
    // ORCHESTRATOR
    // =========================================================================

    #[tokio::test]
    async fn test_fundme_through_the_service() {
        let service = service_with(vec![(FUNDME, fundme())]);
        let address = deploy(&service, FUNDME).await;

        let receipt = service
            .call(CallRequest::main(&address, Value::KeyVal(key('k')), GAS).with_amount(900_000))
            .await
            .unwrap();
        assert!(receipt.transfers.is_empty());
        assert_eq!(service.balance(&address).await, Ok(900_000));

        // The registry balance now counts towards the goal.
        let receipt = service
            .call(CallRequest::main(&address, Value::KeyVal(key('k')), GAS).with_amount(500_000))
            .await
            .unwrap();
        assert_eq!(
            receipt.transfers,
            vec![Transfer {
                to: key('k'),
                amount: 300_000,
            }]
        );
        assert_eq!(receipt.balances.get(&address), Some(&FUNDING_GOAL));
        assert_eq!(service.storage(&address).await, Ok(fundme_value(FUNDING_GOAL)));
    }
}

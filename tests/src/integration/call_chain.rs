//! # Call Chains
//!
//! Multi-hop contract-to-contract calls resolved by the orchestrator:
//! depth-first ordering, Koin flowing along the chain, and all-or-nothing
//! commit when any hop fails.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use kc_contracts::prelude::*;
    use std::sync::atomic::Ordering;

    const FIRST: &str = "chain-1";
    const SECOND: &str = "chain-2";
    const LAST: &str = "chain-3";
    const FAILING: &str = "chain-fail";

    /// `FIRST -> SECOND -> last`, forwarding 5 then 2 Koin units.
    fn chain_sources(last: (&'static str, Expr)) -> Vec<(&'static str, Expr)> {
        vec![
            (FIRST, relay(&address_of(SECOND), 5)),
            (SECOND, relay(&address_of(last.0), 2)),
            last,
        ]
    }

    async fn deploy_chain<S: RegistryStore>(
        service: &ContractService<FixtureParser, S>,
        last: &str,
    ) {
        for code in [FIRST, SECOND, last] {
            deploy(service, code).await;
        }
    }

    #[tokio::test]
    async fn test_successful_chain_commits_every_hop() {
        let service = service_with(chain_sources((LAST, sink())));
        deploy_chain(&service, LAST).await;

        let receipt = service
            .call(CallRequest::main(address_of(FIRST), Value::UnitVal, GAS).with_amount(20))
            .await
            .unwrap();

        for code in [FIRST, SECOND, LAST] {
            assert_eq!(service.storage(&address_of(code)).await, Ok(Value::NatVal(1)));
        }
        assert_eq!(receipt.balances.get(&address_of(FIRST)), Some(&15));
        assert_eq!(receipt.balances.get(&address_of(SECOND)), Some(&3));
        assert_eq!(receipt.balances.get(&address_of(LAST)), Some(&2));
        assert!(receipt.transfers.is_empty());
        assert!(receipt.remaining_gas <= GAS - 3 * costs::EVAL_STEP - 2 * costs::CALL);

        let stats = service.stats().await;
        assert_eq!(stats.calls_committed, 1);
        assert_eq!(stats.entrypoint_invocations, 3);
        assert_eq!(stats.invariant_violations, 0);
    }

    #[tokio::test]
    async fn test_inner_failwith_rolls_back_whole_chain() {
        let service = service_with(chain_sources((FAILING, failing("inner failure"))));
        deploy_chain(&service, FAILING).await;
        let before = service.registry().await;

        let result = service
            .call(CallRequest::main(address_of(FIRST), Value::UnitVal, GAS).with_amount(20))
            .await;
        match result {
            Err(ContractError::Aborted { message, remaining_gas }) => {
                assert_eq!(message, "inner failure");
                assert!(remaining_gas < GAS);
            }
            other => panic!("expected an abort, got {other:?}"),
        }

        // Storages and balances of every hop are untouched.
        assert_eq!(service.registry().await, before);
        assert_eq!(service.balance(&address_of(FIRST)).await, Ok(0));
        assert_eq!(service.storage(&address_of(SECOND)).await, Ok(Value::NatVal(0)));
        assert_eq!(service.stats().await.calls_rolled_back, 1);
    }

    #[tokio::test]
    async fn test_missing_target_rolls_back() {
        let service = service_with(vec![(FIRST, relay(&address_of(SECOND), 0))]);
        deploy(&service, FIRST).await;
        let before = service.registry().await;

        let result = service
            .call(CallRequest::main(address_of(FIRST), Value::UnitVal, GAS))
            .await;
        assert_eq!(result, Err(ContractError::NotFound(address_of(SECOND))));
        assert_eq!(service.registry().await, before);
    }

    #[tokio::test]
    async fn test_operations_resolve_depth_first() {
        const RECORDER: &str = "recorder";
        const OUTER: &str = "outer";
        const MIDDLE: &str = "middle";
        let recorder_address = address_of(RECORDER);
        let middle_address = address_of(MIDDLE);

        let service = service_with(vec![
            (RECORDER, recorder()),
            (MIDDLE, dispatcher(vec![(recorder_address.as_str(), Expr::nat(2))])),
            (
                OUTER,
                dispatcher(vec![
                    (recorder_address.as_str(), Expr::nat(1)),
                    (middle_address.as_str(), Expr::unit()),
                    (recorder_address.as_str(), Expr::nat(3)),
                ]),
            ),
        ]);
        for code in [RECORDER, MIDDLE, OUTER] {
            deploy(&service, code).await;
        }

        service
            .call(CallRequest::main(address_of(OUTER), Value::UnitVal, GAS))
            .await
            .unwrap();

        // Newest first: 1, then MIDDLE's 2, then 3.
        assert_eq!(
            service.storage(&recorder_address).await,
            Ok(Value::ListVal(vec![
                Value::NatVal(3),
                Value::NatVal(2),
                Value::NatVal(1),
            ]))
        );
        assert_eq!(service.stats().await.entrypoint_invocations, 5);
    }

    #[tokio::test]
    async fn test_nested_call_without_gas_for_resolution() {
        let service = service_with(chain_sources((LAST, sink())));
        deploy_chain(&service, LAST).await;
        let before = service.registry().await;

        // Far below what the whole chain needs.
        let result = service
            .call(CallRequest::main(address_of(FIRST), Value::UnitVal, 12 * costs::EVAL_STEP))
            .await;
        assert!(result.is_err());
        assert_eq!(service.registry().await, before);
    }

    #[tokio::test]
    async fn test_rolled_back_calls_never_reach_the_store() {
        init_test_logging();
        let (store, writes) = CountingStore::new();
        let parser = parser_with(chain_sources((FAILING, failing("nope"))));
        let service = ContractService::new(parser, store, ServiceConfig::default());
        deploy_chain(&service, FAILING).await;
        assert_eq!(writes.load(Ordering::SeqCst), 3);

        let result = service
            .call(CallRequest::main(address_of(FIRST), Value::UnitVal, GAS))
            .await;
        assert!(result.is_err());
        assert_eq!(writes.load(Ordering::SeqCst), 3);
    }
}

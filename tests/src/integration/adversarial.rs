//! # Adversarial Inputs
//!
//! Hostile programs and calls: gas exhaustion at every stage, deep nesting,
//! arithmetic traps, overspending and forged parameters. Every case must end
//! in a well-formed result and leave the registry untouched.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use kc_contracts::prelude::*;
    use proptest::prelude::*;

    const COUNTER: &str = "counter";
    const SPENDER: &str = "spender";
    const DIVIDER: &str = "divider";

    /// Sends 10 Koin units to the key it is given.
    fn spender() -> Expr {
        contract(
            Type::Unit,
            ("to", Type::Key),
            Expr::tuple(vec![
                ops(vec![transfer(Expr::var("to"), Expr::koin(10))]),
                Expr::var("s"),
            ]),
            Expr::unit(),
        )
    }

    /// Replaces its storage with the quotient of storage by the parameter.
    fn divider() -> Expr {
        contract(
            Type::Nat,
            ("d", Type::Nat),
            Expr::let_in(
                Pattern::tuple(["q", "r"]),
                Expr::binop(BinOp::Div, Expr::var("s"), Expr::var("d")),
                Expr::tuple(vec![no_ops(), Expr::var("q")]),
            ),
            Expr::nat(17),
        )
    }

    async fn service() -> TestService {
        let service = service_with(vec![
            (COUNTER, counter()),
            (SPENDER, spender()),
            (DIVIDER, divider()),
        ]);
        for code in [COUNTER, SPENDER, DIVIDER] {
            deploy(&service, code).await;
        }
        service
    }

    async fn expect_abort(service: &TestService, request: CallRequest) -> (String, u64) {
        let before = service.registry().await;
        let result = service.call(request).await;
        assert_eq!(service.registry().await, before, "aborted call changed the registry");
        match result {
            Err(ContractError::Aborted {
                message,
                remaining_gas,
            }) => (message, remaining_gas),
            other => panic!("expected an abort, got {other:?}"),
        }
    }

    // =========================================================================
    // GAS
    // =========================================================================

    #[test]
    fn test_initiation_out_of_gas_at_every_stage() {
        let parser = parser_with(vec![(COUNTER, counter())]);
        let config = EngineConfig::default();
        for gas in [0, costs::INIT - 1, costs::INIT, costs::INIT + 3 * costs::CHECK_STEP] {
            assert_eq!(
                initiate_contract(&parser, COUNTER.as_bytes(), gas, &config),
                Err(ContractError::OutOfGas),
                "gas {gas}"
            );
        }
    }

    #[tokio::test]
    async fn test_call_out_of_gas_reports_zero() {
        let service = service().await;
        let request = CallRequest::main(address_of(COUNTER), Value::NatVal(1), 1_500);
        let (message, remaining_gas) = expect_abort(&service, request).await;
        assert_eq!(message, "ran out of gas");
        assert_eq!(remaining_gas, 0);
    }

    #[test]
    fn test_deeply_nested_initializer() {
        const DEPTH: u64 = 2_000;
        let init = (0..DEPTH).fold(Expr::nat(0), |acc, _| {
            Expr::binop(BinOp::Add, acc, Expr::nat(1))
        });
        let tree = contract(
            Type::Nat,
            ("p", Type::Unit),
            Expr::tuple(vec![no_ops(), Expr::var("s")]),
            init,
        );
        let parser = parser_with(vec![("deep", tree)]);

        let contract = initiate_contract(&parser, b"deep", 100 * GAS, &EngineConfig::default())
            .unwrap();
        assert_eq!(contract.storage, Value::NatVal(DEPTH));

        // The same tree with a small budget stops cleanly.
        assert_eq!(
            initiate_contract(&parser, b"deep", GAS / 10, &EngineConfig::default()),
            Err(ContractError::OutOfGas)
        );
    }

    // =========================================================================
    // ARITHMETIC
    // =========================================================================

    #[tokio::test]
    async fn test_division_by_zero_aborts() {
        let service = service().await;
        let divider = address_of(DIVIDER);

        let (message, _) =
            expect_abort(&service, CallRequest::main(&divider, Value::NatVal(0), GAS)).await;
        assert_eq!(message, "Can't divide by zero!");

        service
            .call(CallRequest::main(&divider, Value::NatVal(5), GAS))
            .await
            .unwrap();
        assert_eq!(service.storage(&divider).await, Ok(Value::NatVal(3)));
    }

    #[tokio::test]
    async fn test_nat_overflow_aborts() {
        let service = service().await;
        let counter = address_of(COUNTER);
        service
            .call(CallRequest::main(&counter, Value::NatVal(u64::MAX), GAS))
            .await
            .unwrap();

        let (message, _) =
            expect_abort(&service, CallRequest::main(&counter, Value::NatVal(1), GAS)).await;
        assert_eq!(message, Abort::Overflow.to_string());
        assert_eq!(service.storage(&counter).await, Ok(Value::NatVal(u64::MAX)));
    }

    // =========================================================================
    // SPENDING
    // =========================================================================

    #[tokio::test]
    async fn test_overspending_aborts() {
        let service = service().await;
        let spender = address_of(SPENDER);
        let to = Value::KeyVal(key('r'));

        let request = CallRequest::main(&spender, to.clone(), GAS).with_amount(9);
        let (message, _) = expect_abort(&service, request).await;
        assert_eq!(message, "contract spendings exceed contract balance");

        let receipt = service
            .call(CallRequest::main(&spender, to, GAS).with_amount(10))
            .await
            .unwrap();
        assert_eq!(
            receipt.transfers,
            vec![Transfer {
                to: key('r'),
                amount: 10,
            }]
        );
        assert_eq!(receipt.balances.get(&spender), Some(&0));
    }

    // =========================================================================
    // FORGED CALLS
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_entrypoint() {
        let service = service().await;
        let request = CallRequest {
            entry: "withdraw".into(),
            ..CallRequest::main(address_of(COUNTER), Value::NatVal(1), GAS)
        };
        let (message, remaining_gas) = expect_abort(&service, request).await;
        assert_eq!(message, "unknown entrypoint: withdraw");
        assert!(remaining_gas > 0);
    }

    #[tokio::test]
    async fn test_parameter_of_wrong_type() {
        let service = service().await;
        let request = CallRequest::main(address_of(COUNTER), Value::IntVal(1), GAS);
        let (message, _) = expect_abort(&service, request).await;
        assert_eq!(message, "invalid parameters for entrypoint main");
    }

    #[tokio::test]
    async fn test_rejected_programs_are_never_registered() {
        let no_main = Expr::program(vec![
            Expr::type_decl(STORAGE_TYPE, Type::Nat),
            Expr::storage_init(Expr::nat(0)),
        ]);
        let service = service_with(vec![("no-main", no_main)]);
        let result = service.initiate(b"no-main", GAS).await;
        assert!(matches!(result, Err(ContractError::TypeCheck(_))));
        assert!(matches!(
            service.initiate(b"not registered", GAS).await,
            Err(ContractError::Parse(_))
        ));
        assert_eq!(service.contract_count().await, 0);
    }

    #[tokio::test]
    async fn test_oversized_code_rejected() {
        let config = ServiceConfig {
            engine: EngineConfig {
                max_code_size: 4,
                ..EngineConfig::default()
            },
            ..ServiceConfig::default()
        };
        let service = ContractService::new(
            parser_with(vec![(COUNTER, counter())]),
            InMemoryRegistry::new(),
            config,
        );
        assert_eq!(
            service.initiate(COUNTER.as_bytes(), GAS).await,
            Err(ContractError::CodeTooLarge { size: 7, max: 4 })
        );
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    proptest! {
        #[test]
        fn test_any_budget_yields_a_well_formed_outcome(
            gas in 0u64..40_000,
            step in any::<u32>(),
        ) {
            let parser = parser_with(vec![(COUNTER, counter())]);
            let config = EngineConfig::default();
            let contract = initiate_contract(&parser, COUNTER.as_bytes(), GAS, &config).unwrap();
            let param = Value::NatVal(u64::from(step));
            let call = EntryCall::new(MAIN_ENTRY, param, contract.storage.clone(), gas);
            let outcome = interpret_contract_call(&contract.program, &call);

            prop_assert!(outcome.remaining_gas <= gas);
            if outcome.is_failure() {
                prop_assert_eq!(outcome.failure_message(), Some("ran out of gas"));
                prop_assert_eq!(&outcome.storage, &contract.storage);
                prop_assert_eq!(outcome.spent, 0);
                prop_assert_eq!(outcome.remaining_gas, 0);
            } else {
                prop_assert_eq!(outcome.storage, Value::NatVal(u64::from(step)));
            }
        }
    }
}

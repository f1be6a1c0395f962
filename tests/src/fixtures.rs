//! # Test Fixtures
//!
//! Contract trees as the external parser would hand them over, plus a small
//! harness around the orchestrator service.

use async_trait::async_trait;
use kc_contracts::prelude::*;
use kc_telemetry::{init_logging, TelemetryConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Gas budget generous enough for every fixture.
pub const GAS: u64 = 10_000_000;

/// Source text of the crowdfunding contract.
pub const FUNDME: &str = "fundme";

/// Funding goal of [`fundme`], in Koin units.
pub const FUNDING_GOAL: u64 = 1_100_000;

/// Installs a subscriber once per test binary; later calls are no-ops.
pub fn init_test_logging() {
    let _ = init_logging(&TelemetryConfig::from_env());
}

// =============================================================================
// TREE HELPERS
// =============================================================================

/// A valid key made of one repeated character.
#[must_use]
pub fn key(seed: char) -> String {
    std::iter::repeat(seed).take(KEY_LENGTH).collect()
}

/// `([] : operation list)`
#[must_use]
pub fn no_ops() -> Expr {
    ops(Vec::new())
}

/// `[op1; op2; ...]`
#[must_use]
pub fn ops(items: Vec<Expr>) -> Expr {
    Expr::list(Some(Type::Operation), items)
}

/// `Current.<field>()`
#[must_use]
pub fn current(field: &str) -> Expr {
    Expr::call(Expr::module("Current", field), vec![Expr::unit()])
}

/// `Current.failwith(message)`
#[must_use]
pub fn failwith(message: &str) -> Expr {
    Expr::call(Expr::module("Current", "failwith"), vec![Expr::string(message)])
}

/// `Account.transfer(to, amount)`
#[must_use]
pub fn transfer(to: Expr, amount: Expr) -> Expr {
    Expr::call(Expr::module("Account", "transfer"), vec![to, amount])
}

/// `Contract.call(target, amount, entry, param)`
#[must_use]
pub fn contract_call(target: &str, amount: Expr, entry: &str, param: Expr) -> Expr {
    Expr::call(
        Expr::module("Contract", "call"),
        vec![
            Expr::lit(Literal::Address(target.to_string())),
            amount,
            Expr::string(entry),
            param,
        ],
    )
}

/// `head :: tail`
#[must_use]
pub fn cons(head: Expr, tail: Expr) -> Expr {
    ExprKind::Cons {
        head: Box::new(head),
        tail: Box::new(tail),
    }
    .into()
}

/// Program with a storage type, a one-parameter `main` whose storage is
/// bound to `s`, and an initializer.
#[must_use]
pub fn contract(storage: Type, param: (&str, Type), body: Expr, init: Expr) -> Expr {
    Expr::program(vec![
        Expr::type_decl(STORAGE_TYPE, storage),
        Expr::entry(
            MAIN_ENTRY,
            vec![(param.0, Some(param.1))],
            Pattern::name("s"),
            body,
        ),
        Expr::storage_init(init),
    ])
}

// =============================================================================
// CONTRACTS
// =============================================================================

/// Adds its parameter to a `nat` storage.
#[must_use]
pub fn counter() -> Expr {
    contract(
        Type::Nat,
        ("step", Type::Nat),
        Expr::tuple(vec![
            no_ops(),
            Expr::binop(BinOp::Add, Expr::var("s"), Expr::var("step")),
        ]),
        Expr::nat(0),
    )
}

/// Storage type of [`fundme`].
#[must_use]
pub fn fundme_storage() -> Type {
    Type::Struct(vec![
        ("funding_goal".into(), Type::Koin),
        ("amount_raised".into(), Type::Koin),
    ])
}

/// Storage value of [`fundme`] after raising `raised`.
#[must_use]
pub fn fundme_value(raised: u64) -> Value {
    Value::record([
        ("funding_goal", Value::KoinVal(FUNDING_GOAL)),
        ("amount_raised", Value::KoinVal(raised)),
    ])
}

/// Crowdfunding contract. Accepts funds until the goal is reached and
/// refunds whatever goes past it to the caller-supplied key.
#[must_use]
pub fn fundme() -> Expr {
    let raised = |value: Expr| Expr::update("s", vec!["amount_raised"], value);
    contract(
        fundme_storage(),
        ("refund_to", Type::Key),
        Expr::let_in(
            Pattern::name("total"),
            Expr::binop(BinOp::Add, current("balance"), current("amount")),
            Expr::let_in(
                Pattern::name("goal"),
                Expr::field(Expr::var("s"), "funding_goal"),
                Expr::if_else(
                    Expr::binop(BinOp::Leq, Expr::var("total"), Expr::var("goal")),
                    Expr::tuple(vec![no_ops(), raised(Expr::var("total"))]),
                    Expr::tuple(vec![
                        ops(vec![transfer(
                            Expr::var("refund_to"),
                            Expr::binop(BinOp::Sub, Expr::var("total"), Expr::var("goal")),
                        )]),
                        raised(Expr::var("goal")),
                    ]),
                ),
            ),
        ),
        Expr::record(vec![
            ("funding_goal", Expr::koin(FUNDING_GOAL)),
            ("amount_raised", Expr::koin(0)),
        ]),
    )
}

/// Counts its invocations and forwards `attach` Koin to `target.main(())`.
#[must_use]
pub fn relay(target: &str, attach: u64) -> Expr {
    contract(
        Type::Nat,
        ("p", Type::Unit),
        Expr::tuple(vec![
            ops(vec![contract_call(
                target,
                Expr::koin(attach),
                MAIN_ENTRY,
                Expr::unit(),
            )]),
            Expr::binop(BinOp::Add, Expr::var("s"), Expr::nat(1)),
        ]),
        Expr::nat(0),
    )
}

/// Counts its invocations.
#[must_use]
pub fn sink() -> Expr {
    contract(
        Type::Nat,
        ("p", Type::Unit),
        Expr::tuple(vec![
            no_ops(),
            Expr::binop(BinOp::Add, Expr::var("s"), Expr::nat(1)),
        ]),
        Expr::nat(0),
    )
}

/// Always fails with `message`.
#[must_use]
pub fn failing(message: &str) -> Expr {
    contract(
        Type::Nat,
        ("p", Type::Unit),
        Expr::let_in(
            Pattern::name("_"),
            failwith(message),
            Expr::tuple(vec![no_ops(), Expr::var("s")]),
        ),
        Expr::nat(0),
    )
}

/// Prepends every received `nat` to its storage list.
#[must_use]
pub fn recorder() -> Expr {
    contract(
        Type::list(Type::Nat),
        ("n", Type::Nat),
        Expr::tuple(vec![no_ops(), cons(Expr::var("n"), Expr::var("s"))]),
        Expr::list(Some(Type::Nat), Vec::new()),
    )
}

/// Emits each call in `calls` as `target.main(param)` with no Koin attached.
#[must_use]
pub fn dispatcher(calls: Vec<(&str, Expr)>) -> Expr {
    let calls = calls
        .into_iter()
        .map(|(target, param)| contract_call(target, Expr::koin(0), MAIN_ENTRY, param))
        .collect();
    contract(
        Type::Unit,
        ("p", Type::Unit),
        Expr::tuple(vec![ops(calls), Expr::var("s")]),
        Expr::unit(),
    )
}

// =============================================================================
// HARNESS
// =============================================================================

/// Service type used throughout the suite.
pub type TestService = ContractService<FixtureParser, InMemoryRegistry>;

/// Address a source text deploys to.
#[must_use]
pub fn address_of(code: &str) -> String {
    contract_address(code.as_bytes())
}

/// Parser knowing every `(source, tree)` pair.
#[must_use]
pub fn parser_with(sources: Vec<(&str, Expr)>) -> FixtureParser {
    sources
        .into_iter()
        .fold(FixtureParser::new(), |parser, (code, tree)| parser.with(code, tree))
}

/// Service with default configuration over the given sources.
#[must_use]
pub fn service_with(sources: Vec<(&str, Expr)>) -> TestService {
    init_test_logging();
    ContractService::new(
        parser_with(sources),
        InMemoryRegistry::new(),
        ServiceConfig::default(),
    )
}

/// Deploys `code` and returns its address.
///
/// # Panics
///
/// Panics if deployment fails.
pub async fn deploy<P: SourceParser, S: RegistryStore>(
    service: &ContractService<P, S>,
    code: &str,
) -> String {
    service
        .initiate(code.as_bytes(), GAS)
        .await
        .unwrap_or_else(|err| panic!("deploying {code}: {err}"))
        .address
}

/// Registry store counting how often it is written.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryRegistry,
    stores: Arc<AtomicUsize>,
}

impl CountingStore {
    /// Store plus a handle to its write counter.
    #[must_use]
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let store = Self::default();
        let stores = Arc::clone(&store.stores);
        (store, stores)
    }
}

#[async_trait]
impl RegistryStore for CountingStore {
    async fn load(&self) -> Registry {
        self.inner.load().await
    }

    async fn store(&self, registry: Registry) {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(registry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha3::{Digest, Keccak256};

    #[test]
    fn test_address_is_keccak_prefix() {
        let digest = Keccak256::digest(FUNDME.as_bytes());
        assert_eq!(address_of(FUNDME), hex::encode(&digest[..16]));
        assert_eq!(address_of(FUNDME).len(), KEY_LENGTH);
    }

    fn all_fixtures() -> Vec<Expr> {
        let target = key('a');
        vec![
            counter(),
            fundme(),
            sink(),
            failing("x"),
            recorder(),
            relay(&target, 1),
            dispatcher(vec![(target.as_str(), Expr::nat(1)), (target.as_str(), Expr::unit())]),
        ]
    }

    #[test]
    fn test_fixtures_check() {
        for tree in all_fixtures() {
            let checked = check(&tree, GAS);
            assert!(checked.ok, "{:?}", checked.error);
        }
    }

    #[test]
    fn test_fixtures_check_idempotently() {
        for tree in all_fixtures() {
            let first = check(&tree, GAS);
            let second = check(&first.program.erase(), GAS);
            assert!(second.ok, "{:?}", second.error);
            assert_eq!(first.program, second.program);
            assert_eq!(first.remaining_gas, second.remaining_gas);
        }
    }
}

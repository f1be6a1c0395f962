//! # Contract Engine Benchmarks
//!
//! | Stage | Input |
//! |-------|-------|
//! | Check | fundme, nested initializers of growing depth |
//! | Interpret | fundme refund path |
//! | Orchestrate | three-hop relay chain |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kc_contracts::prelude::*;
use kc_tests::fixtures::{self, address_of, fundme, relay, sink, GAS};
use sha3::{Digest, Keccak256};

fn bench_checker(c: &mut Criterion) {
    let mut group = c.benchmark_group("checker");

    let program = fundme();
    group.bench_function("fundme", |b| b.iter(|| black_box(check(&program, GAS))));

    for depth in [100u64, 1_000, 5_000] {
        let init = (0..depth).fold(Expr::nat(0), |acc, _| {
            Expr::binop(BinOp::Add, acc, Expr::nat(1))
        });
        let program = fixtures::contract(
            Type::Nat,
            ("p", Type::Unit),
            Expr::tuple(vec![fixtures::no_ops(), Expr::var("s")]),
            init,
        );
        group.throughput(Throughput::Elements(depth));
        group.bench_with_input(BenchmarkId::new("nested_init", depth), &program, |b, p| {
            b.iter(|| black_box(check(p, u64::MAX)))
        });
    }
    group.finish();
}

fn bench_interpreter(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpreter");

    let parser = fixtures::parser_with(vec![(fixtures::FUNDME, fundme())]);
    let contract = initiate_contract(
        &parser,
        fixtures::FUNDME.as_bytes(),
        GAS,
        &EngineConfig::default(),
    )
    .expect("fundme initializes");
    let call = EntryCall::new(
        MAIN_ENTRY,
        Value::KeyVal(fixtures::key('k')),
        fixtures::fundme_value(900_000),
        GAS,
    )
    .with_amount(500_000)
    .with_balance(1_000_000);

    group.bench_function("fundme_refund", |b| {
        b.iter(|| black_box(interpret_contract_call(&contract.program, &call)))
    });
    group.finish();
}

fn bench_orchestrator(c: &mut Criterion) {
    let mut group = c.benchmark_group("orchestrator");
    let runtime = tokio::runtime::Runtime::new().expect("runtime");

    let service = fixtures::service_with(vec![
        ("hop-1", relay(&address_of("hop-2"), 0)),
        ("hop-2", relay(&address_of("hop-3"), 0)),
        ("hop-3", sink()),
    ]);
    runtime.block_on(async {
        for code in ["hop-1", "hop-2", "hop-3"] {
            fixtures::deploy(&service, code).await;
        }
    });

    let entry = address_of("hop-1");
    group.bench_function("three_hop_chain", |b| {
        b.iter(|| {
            runtime.block_on(async {
                black_box(
                    service
                        .call(CallRequest::main(&entry, Value::UnitVal, GAS))
                        .await
                        .expect("chain commits"),
                )
            })
        })
    });
    group.finish();
}

fn bench_content_address(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_address");
    for size in [64usize, 4_096, 65_536] {
        let code = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("contract_address", size), &code, |b, code| {
            b.iter(|| black_box(contract_address(code)))
        });
        group.bench_with_input(BenchmarkId::new("raw_keccak", size), &code, |b, code| {
            b.iter(|| black_box(Keccak256::digest(code)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_checker,
    bench_interpreter,
    bench_orchestrator,
    bench_content_address
);
criterion_main!(benches);

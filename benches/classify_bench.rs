use criterion::{Criterion, black_box, criterion_group, criterion_main};
use hugegraph_rust_loader::address::{resolve_address, resolve_direct};
use hugegraph_rust_loader::{ClientFailure, LoadOptions, Protocol, classify};
use rand::seq::SliceRandom;
use rand::thread_rng;

fn sample_failures(n: usize) -> Vec<ClientFailure> {
    let kinds = [
        ClientFailure::state("The version 0.20 of hugegraph-server api is lower than 0.38"),
        ClientFailure::server(401, "Unauthorized"),
        ClientFailure::server(500, "backend not initialized"),
        ClientFailure::transport(
            "error sending request",
            Some("tcp connect error: Connection refused (os error 111)".into()),
        ),
        ClientFailure::transport(
            "error sending request",
            Some("UnknownHostException: dns error".into()),
        ),
        ClientFailure::transport("error sending request", Some("connect timed out".into())),
        ClientFailure::transport("error sending request", None),
    ];
    let mut failures: Vec<ClientFailure> = kinds.iter().cycle().take(n).cloned().collect();
    failures.shuffle(&mut thread_rng());
    failures
}

fn bench_classify(c: &mut Criterion) {
    let failures = sample_failures(1000);
    c.bench_function("classify 1000 failures", |b| {
        b.iter(|| {
            for failure in &failures {
                black_box(classify(failure.clone(), "10.0.0.5", 8080));
            }
        });
    });
}

fn bench_resolve(c: &mut Criterion) {
    let options = LoadOptions {
        host: "db.example.com".into(),
        protocol: Some(Protocol::Https),
        ..LoadOptions::default()
    };
    c.bench_function("resolve address", |b| {
        b.iter(|| resolve_address(black_box("db.example.com"), 8080, Some(Protocol::Https)));
    });
    c.bench_function("resolve direct config", |b| {
        b.iter(|| resolve_direct(black_box(&options), Some("/opt/loader")));
    });
}

use std::time::Duration;

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(5));
    targets = bench_classify, bench_resolve
}
criterion_main!(benches);

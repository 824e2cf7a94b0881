use axum::http::{HeaderMap, HeaderValue};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reqlimit::rate_limit::{client_ip, LimiterRegistry, WindowKey};
use reqlimit::store::MemoryStore;
use std::net::SocketAddr;
use std::sync::Arc;

fn benchmark_window_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_key");

    for namespace in ["", "Appname"] {
        group.bench_with_input(
            BenchmarkId::from_parameter(if namespace.is_empty() { "unscoped" } else { "scoped" }),
            &namespace,
            |b, namespace| {
                b.iter(|| black_box(WindowKey::new(namespace, "rps", "192.168.1.1")))
            },
        );
    }

    group.finish();
}

fn benchmark_client_ip(c: &mut Criterion) {
    let remote: SocketAddr = "10.0.0.1:40000".parse().expect("valid address");

    let mut forwarded = HeaderMap::new();
    forwarded.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.7"));
    let empty = HeaderMap::new();

    c.bench_function("client_ip_forwarded_header", |b| {
        b.iter(|| black_box(client_ip(&forwarded, Some(remote))))
    });
    c.bench_function("client_ip_remote_addr", |b| {
        b.iter(|| black_box(client_ip(&empty, Some(remote))))
    });
}

fn benchmark_memory_evaluate(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");

    let mut registry = LimiterRegistry::with_store("bench", Arc::new(MemoryStore::new()));
    let limiter = registry
        .new_limiter("rps", 60, u32::MAX)
        .expect("Failed to register limiter");

    c.bench_function("memory_evaluate_single_identity", |b| {
        b.to_async(&runtime).iter(|| {
            let limiter = limiter.clone();
            async move { black_box(limiter.evaluate("192.168.1.1").await.unwrap()) }
        })
    });

    let identities: Vec<String> = (0..1024)
        .map(|i| format!("10.0.{}.{}", i / 256, i % 256))
        .collect();
    c.bench_function("memory_evaluate_many_identities", |b| {
        let mut next = 0usize;
        b.to_async(&runtime).iter(|| {
            next = (next + 1) % identities.len();
            let identity = identities[next].clone();
            let limiter = limiter.clone();
            async move { black_box(limiter.evaluate(&identity).await.unwrap()) }
        })
    });
}

criterion_group!(
    benches,
    benchmark_window_key,
    benchmark_client_ip,
    benchmark_memory_evaluate
);
criterion_main!(benches);

//! Gateway Benchmarks
//!
//! Hot path of a flag query: subject normalization, namespacing, local
//! evaluation and the fallback path.

use criterion::{Criterion, criterion_group, criterion_main};
use flagway::prelude::*;
use flagway_features::local::{Condition, Operator, Rollout, TargetingRule};
use flagway_features::{attributes_of, identify, namespace};
use flagway_log::NoopLogger;
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn gateway(config: GatewayConfig) -> FlagGateway {
    let datafile = Datafile::new(vec![
        FeatureFlag::boolean("BE_checkout", false)
            .with_rule(TargetingRule::new(true).with_condition(Condition::new(
                "country",
                Operator::In,
                ["PT", "ES"],
            )))
            .with_variable("limit", 10),
        FeatureFlag::boolean("BE_search", false).with_rollout(Rollout::new(30, true)),
    ]);

    FlagGateway::new(
        config,
        Arc::new(LocalProvider::with_datafile(datafile)),
        Arc::new(NoopLogger),
    )
}

fn remote() -> GatewayConfig {
    GatewayConfig::builder()
        .environment_key("bench")
        .static_default("checkout", false)
        .build()
        .unwrap()
}

// =============================================================================
// Normalization Benchmarks
// =============================================================================

fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalization");
    let config = remote();
    let user = json!({
        "_id": "testId",
        "organization": "orgId",
        "site": {"_id": "siteId"},
        "country": 3,
        "isCoach": true,
        "randomStuff": "yes",
    });

    group.bench_function("namespace", |b| {
        b.iter(|| black_box(namespace(black_box("checkout"), &config)))
    });

    group.bench_function("identify", |b| b.iter(|| black_box(identify(Some(&user)))));

    group.bench_function("attributes_of", |b| {
        b.iter(|| black_box(attributes_of(Some(&user))))
    });

    group.finish();
}

// =============================================================================
// Gateway Benchmarks
// =============================================================================

fn bench_gateway(c: &mut Criterion) {
    let mut group = c.benchmark_group("gateway");
    let remote = gateway(remote());
    let static_mode = gateway(GatewayConfig::default());
    let user = json!({"_id": "u-1", "country": "PT"});

    group.bench_function("has_feature_targeted", |b| {
        b.iter(|| black_box(remote.has_feature("checkout", Some(&user))))
    });

    group.bench_function("has_feature_rollout", |b| {
        b.iter(|| black_box(remote.has_feature("search", Some(&user))))
    });

    group.bench_function("has_feature_fallback", |b| {
        b.iter(|| black_box(remote.has_feature("unknown", Some(&user))))
    });

    group.bench_function("has_feature_static", |b| {
        b.iter(|| black_box(static_mode.has_feature("checkout", Some(&user))))
    });

    group.bench_function("get_feature_variable", |b| {
        b.iter(|| black_box(remote.get_feature_variable("checkout", "limit", Some(&user))))
    });

    group.finish();
}

criterion_group!(gateway_benches, bench_normalization, bench_gateway);

criterion_main!(gateway_benches);

use std::hint::black_box;

use bencher::{RouteTable, TestCase};
use bytes::Bytes;
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use micro_dispatch::{AppServer, CompiledPattern, RequestHandler, RouteConfig, RouterHub, handler_fn};

static USERS: RouteTable = RouteTable::new(
    "/users/",
    &[
        "/users/",
        "/users/:userId",
        "/users/:userId/sites",
        "/users/:userId/sites/:siteId",
        "/users/:userId/sites/:siteId/plugins/:pluginId",
    ],
);

// every route has the same depth, the last one is only found after testing all the others
static CROWDED: RouteTable = RouteTable::new(
    "/api/",
    &[
        "/api/:id/accounts",
        "/api/:id/billing",
        "/api/:id/cards",
        "/api/:id/devices",
        "/api/:id/events",
        "/api/:id/files",
        "/api/:id/groups",
        "/api/:id/hooks",
    ],
);

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("one_param", USERS, "/users/42"),
        TestCase::normal("two_params", USERS, "/users/42/sites/7"),
        TestCase::large("three_params", USERS, "/users/42/sites/7/plugins/9"),
        TestCase::large("crowded_bucket", CROWDED, "/api/7/hooks"),
    ]
}

fn ok_handler() -> impl RequestHandler {
    handler_fn(|_, resp, _| {
        resp.write_str("ok");
        Ok(())
    })
}

fn build_hub(table: &RouteTable) -> RouterHub {
    let mut hub = RouterHub::new(table.base_pattern());
    for pattern in table.patterns() {
        hub.route(pattern, ok_handler(), RouteConfig::new()).expect("benchmark patterns should be valid");
    }
    hub
}

fn build_server(table: &RouteTable) -> AppServer {
    AppServer::builder().hub(build_hub(table)).build().expect("benchmark hub should be unique")
}

fn benchmark_pattern_compile(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("pattern_compile");

    for pattern in USERS.patterns() {
        group.bench_with_input(BenchmarkId::from_parameter(pattern), pattern, |b, pattern| {
            b.iter(|| black_box(CompiledPattern::compile(pattern).expect("benchmark patterns should be valid")));
        });
    }

    group.finish();
}

fn benchmark_hub_lookup(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("hub_lookup");

    for case in create_test_cases() {
        let hub = build_hub(case.table());
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter(|| black_box(hub.at(case.path()).expect("benchmark path should match")));
        });
    }

    group.finish();
}

fn benchmark_server_dispatch(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("server_dispatch");

    for case in create_test_cases() {
        let server = build_server(case.table());
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter_batched(
                || {
                    http::Request::builder()
                        .uri(case.path())
                        .header(http::header::HOST, "localhost")
                        .body(Bytes::new())
                        .expect("benchmark request should be valid")
                },
                |request| black_box(server.dispatch(request, None)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(dispatch, benchmark_pattern_compile, benchmark_hub_lookup, benchmark_server_dispatch);
criterion_main!(dispatch);

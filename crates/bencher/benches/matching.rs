use bencher::{RouteFixture, TestCase};
use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use http::{Request, Response};
use micro_router::pattern::{CompiledPattern, Formats, MatchMode, Patterns};
use micro_router::{handler_fn, Context, ResponseSink, Router};
use std::hint::black_box;

static ROOT: RouteFixture = RouteFixture::hit("/", "/", &[]);
static USER: RouteFixture = RouteFixture::hit("/user/:id", "/user/42.json", &[("id", "42")]);
static POST: RouteFixture =
    RouteFixture::hit("/user/:id/posts/:post", "/user/42/posts/7", &[("id", "42"), ("post", "7")]);
static MISSING: RouteFixture = RouteFixture::miss("/user/:id", "/account/settings");

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("root", ROOT),
        TestCase::new("user_profile", USER),
        TestCase::new("user_post", POST),
        TestCase::new("missing", MISSING),
    ]
}

fn registries() -> (Patterns, Formats) {
    let mut patterns = Patterns::new();
    patterns.set("id", "[0-9]+").expect("fragment should compile");
    (patterns, ["json", "xml"].into_iter().collect())
}

fn benchmark_pattern(criterion: &mut Criterion) {
    let (patterns, formats) = registries();
    let mut group = criterion.benchmark_group("pattern");

    for case in create_test_cases() {
        let fixture = *case.fixture();
        group.bench_with_input(BenchmarkId::new("compile", case.id()), &fixture, |b, fixture| {
            b.iter(|| black_box(CompiledPattern::compile(fixture.template(), &patterns, &formats, MatchMode::Full)));
        });

        let compiled = CompiledPattern::compile(fixture.template(), &patterns, &formats, MatchMode::Full)
            .expect("template should compile");
        let captured = compiled.captures(fixture.path());
        let pairs = captured
            .as_ref()
            .map(|params| params.iter().map(|param| (param.key(), param.value().unwrap_or_default())));
        if let Err(e) = fixture.verify(pairs) {
            panic!("{e}");
        }

        group.bench_with_input(BenchmarkId::new("captures", case.id()), &fixture, |b, fixture| {
            b.iter(|| black_box(compiled.captures(fixture.path())));
        });
    }

    group.finish();
}

struct Discard;

impl ResponseSink for Discard {
    fn send(&mut self, response: Response<Bytes>) {
        black_box(response);
    }
}

fn build_router() -> Router {
    let mut router = Router::new();
    router.pattern("id", "[0-9]+").expect("fragment should compile").add_format("json");
    router.get("/", handler_fn(|_ctx: &mut Context| Ok(()))).expect("route should compile");
    for section in ["blog", "docs", "shop", "admin"] {
        let sub = router.sub_router(section).expect("prefix should compile");
        sub.get(":id", handler_fn(|_ctx: &mut Context| Ok(()))).expect("route should compile");
    }
    let user = router.sub_router("user").expect("prefix should compile");
    user.get(":id", handler_fn(|_ctx: &mut Context| Ok(()))).expect("route should compile");
    user.get(":id/posts/:post", handler_fn(|_ctx: &mut Context| Ok(()))).expect("route should compile");
    router
}

fn request(fixture: &RouteFixture) -> Request<Bytes> {
    Request::builder().uri(fixture.path()).body(Bytes::new()).expect("request should build")
}

fn benchmark_dispatch(criterion: &mut Criterion) {
    let router = build_router();
    let runtime = tokio::runtime::Builder::new_current_thread().build().expect("runtime should start");
    let mut group = criterion.benchmark_group("dispatch");

    for case in create_test_cases() {
        let fixture = *case.fixture();
        let ctx = runtime.block_on(router.dispatch(request(&fixture), Discard));
        assert_eq!(ctx.is_matched(), fixture.should_match(), "{} dispatched unexpectedly", case.name());

        group.bench_with_input(BenchmarkId::from_parameter(case.id()), &fixture, |b, fixture| {
            b.iter_batched(
                || request(fixture),
                |request| black_box(runtime.block_on(router.dispatch(request, Discard))),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(matching, benchmark_pattern, benchmark_dispatch);
criterion_main!(matching);

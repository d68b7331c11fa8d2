use axum::http::Request;
use axum::{Router, routing::get};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use roomstay::csrf::{CsrfToken, constant_time_eq};
use roomstay::{App, AppState, ConfigBuilder, MemorySource, TemplateCache, TemplateData};
use std::sync::Arc;
use tower::ServiceExt;

const LAYOUT: &str = "<html><head><title>{{string_map.title}}</title></head><body>{{> content}}</body></html>";
const PAGE: &str = r#"{{#> base}}{{#*inline "content"}}<h1>{{string_map.title}}</h1><form><input type="hidden" name="csrf_token" value="{{{csrf_token}}}"></form>{{/inline}}{{/base}}"#;

fn source() -> Arc<MemorySource> {
    Arc::new(
        MemorySource::new()
            .with_layout("base", LAYOUT)
            .with_page("home.page.hbs", PAGE),
    )
}

fn benchmark_template_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_render");
    let data = TemplateData::new().with_string("title", "Search Availability");

    let cached = TemplateCache::new(source(), true);
    let reloading = TemplateCache::new(source(), false);

    group.bench_function("cached", |b| {
        b.iter(|| cached.render(black_box("home.page.hbs"), &data).unwrap());
    });

    group.bench_function("reload_every_render", |b| {
        b.iter(|| reloading.render(black_box("home.page.hbs"), &data).unwrap());
    });

    group.finish();
}

fn benchmark_token(c: &mut Criterion) {
    let mut group = c.benchmark_group("csrf_token");
    let a = CsrfToken::generate().unwrap();
    let b_token = CsrfToken::generate().unwrap();

    group.bench_function("generate", |b| b.iter(CsrfToken::generate));
    group.bench_function("compare_equal", |b| {
        b.iter(|| constant_time_eq(black_box(a.as_str().as_bytes()), a.as_str().as_bytes()));
    });
    group.bench_function("compare_different", |b| {
        b.iter(|| constant_time_eq(black_box(a.as_str().as_bytes()), b_token.as_str().as_bytes()));
    });

    group.finish();
}

async fn make_request(router: &Router, path: &str) {
    let req = Request::builder()
        .uri(path)
        .body(axum::body::Body::empty())
        .unwrap();

    let _response = router.clone().oneshot(req).await.unwrap();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    let raw_router = Router::new().route("/", get(|| async { "Hello, World!" }));

    let config = ConfigBuilder::new()
        .with_template_cache(true)
        .with_access_log(roomstay::AccessLogConfig::builder().enabled(false).build())
        .build()
        .unwrap();
    let state = AppState::builder(config).with_template_source(source()).build();
    let roomstay_router = App::new(state).into_test_router().unwrap();

    let rt = tokio::runtime::Runtime::new().unwrap();

    group.bench_function("raw_axum", |b| {
        b.iter(|| rt.block_on(make_request(black_box(&raw_router), "/")));
    });

    group.bench_function("full_pipeline_get", |b| {
        b.iter(|| rt.block_on(make_request(black_box(&roomstay_router), "/")));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_template_cache,
    benchmark_token,
    benchmark_pipeline
);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;
use tera::Context;

use terabridge::config::load_config;
use terabridge::lexer::{DelimiterSet, Tag};
use terabridge::Bridge;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn sample_context() -> Context {
    let mut context = Context::new();
    context.insert("name", "Benchmark User");
    context.insert("title", "Bench Project Title");
    context
}

fn bench_config_loading(c: &mut Criterion) {
    let path = fixture_path("basic-bridge");

    c.bench_function("load_config", |b| {
        b.iter(|| {
            let config = load_config(black_box(&path)).unwrap();
            black_box(config)
        });
    });
}

fn bench_lexer_translate(c: &mut Criterion) {
    let lexer = DelimiterSet {
        comment: Tag::new("[#", "#]"),
        block: Tag::new("[%", "%]"),
        variable: Tag::new("[[", "]]"),
    }
    .lexer()
    .unwrap();
    let source = "[# header #]<h1>[[ title ]]</h1>\n\
                  [% for item in items %]<li>[[ item | upper ]]</li>[% endfor %]\n\
                  Literal {{ braces }} stay put.\n"
        .repeat(50);

    c.bench_function("lexer_translate", |b| {
        b.iter(|| {
            let out = lexer.translate("bench", black_box(&source)).unwrap();
            black_box(out.len())
        });
    });
}

fn bench_renderer_build(c: &mut Criterion) {
    let bridge = Bridge::from_path(&fixture_path("basic-bridge")).unwrap();

    c.bench_function("bridge_renderer", |b| {
        b.iter(|| {
            let renderer = bridge.renderer().unwrap();
            black_box(renderer)
        });
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let path = fixture_path("custom-delimiters");

    c.bench_function("full_pipeline (config + renderer + render)", |b| {
        b.iter(|| {
            let bridge = Bridge::from_path(black_box(&path)).unwrap();
            let renderer = bridge.renderer().unwrap();
            let out = renderer.render("greeting", &sample_context()).unwrap();
            black_box(out)
        });
    });
}

criterion_group!(
    benches,
    bench_config_loading,
    bench_lexer_translate,
    bench_renderer_build,
    bench_full_pipeline
);
criterion_main!(benches);

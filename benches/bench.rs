// Criterion benchmarks for the text classifier

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use text_classifier::core::{decode_artifact, parse_request, InferenceEngine};
use text_classifier::services::{ArtifactStore, ModelCache, StoreError};

const NEWSGROUPS_MODEL: &str = include_str!("../tests/fixtures/newsgroups_model.json");

struct StaticStore;

#[async_trait]
impl ArtifactStore for StaticStore {
    async fn fetch(&self, _store: &str, _key: &str) -> Result<Vec<u8>, StoreError> {
        Ok(NEWSGROUPS_MODEL.as_bytes().to_vec())
    }
}

fn bench_decode_artifact(c: &mut Criterion) {
    c.bench_function("decode_artifact", |b| {
        b.iter(|| decode_artifact(black_box(NEWSGROUPS_MODEL.as_bytes())).unwrap());
    });
}

fn bench_parse_request(c: &mut Criterion) {
    let payload = br#"{"text": "The graphics card overheated during rendering."}"#;
    c.bench_function("parse_request", |b| {
        b.iter(|| parse_request(black_box(payload)).unwrap());
    });
}

fn bench_classify(c: &mut Criterion) {
    let model = decode_artifact(NEWSGROUPS_MODEL.as_bytes()).unwrap();
    let engine = InferenceEngine::new();
    let mut group = c.benchmark_group("classify");

    for words in [8usize, 64, 512] {
        let text = "the graphics card overheated during rendering of polygons "
            .split_whitespace()
            .cycle()
            .take(words)
            .collect::<Vec<_>>()
            .join(" ");

        group.bench_with_input(BenchmarkId::from_parameter(words), &text, |b, text| {
            b.iter(|| engine.classify(model.as_ref(), black_box(text)).unwrap());
        });
    }

    group.finish();
}

fn bench_cache_hit(c: &mut Criterion) {
    let cache = ModelCache::new(Arc::new(StaticStore));
    tokio_test::block_on(cache.acquire("bucket", "model.json")).unwrap();

    c.bench_function("model_cache_hit", |b| {
        b.iter(|| tokio_test::block_on(cache.acquire(black_box("bucket"), black_box("model.json"))).unwrap());
    });
}

criterion_group!(
    benches,
    bench_decode_artifact,
    bench_parse_request,
    bench_classify,
    bench_cache_hit
);
criterion_main!(benches);

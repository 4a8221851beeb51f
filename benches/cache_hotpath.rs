use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use tokio::runtime::Runtime;
use visual_cache::cache::{
    cache_key, CacheConfig, CacheQuery, ElementType, GenerationParameters, MetadataOverrides,
    VisualArtifact, VisualCache,
};

fn rt() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("build runtime")
}

fn params() -> GenerationParameters {
    GenerationParameters::new("runway", "1280x720")
        .with_seed(42)
        .with_param("motion", serde_json::json!({"camera": "dolly", "strength": 0.6}))
}

fn populated(rt: &Runtime, entries: usize) -> VisualCache {
    let cache = VisualCache::new(CacheConfig::builder().max_entries(entries * 2).build())
        .expect("build cache");
    rt.block_on(async {
        for i in 0..entries {
            let prompt = format!("Street scene {}", i);
            cache
                .insert(
                    ElementType::BACKGROUND_SCENE,
                    &prompt,
                    &params(),
                    VisualArtifact::new(prompt.as_str(), 0.7, params()),
                    MetadataOverrides::new()
                        .project("bench")
                        .tag(if i % 2 == 0 { "day" } else { "night" }),
                )
                .await
                .expect("insert");
        }
    });
    cache
}

fn bench_key(c: &mut Criterion) {
    let params = params();
    c.bench_function("cache/key", |b| {
        b.iter(|| {
            black_box(cache_key(
                &ElementType::CHARACTER_DESIGN,
                black_box("Alice in forest"),
                &params,
            ))
        });
    });
}

fn bench_lookup(c: &mut Criterion) {
    let rt = rt();
    let mut group = c.benchmark_group("cache/lookup");

    for size in [100usize, 1_000, 10_000] {
        let cache = populated(&rt, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let prompt = format!("Street scene {}", size / 2);
            b.to_async(&rt).iter(|| async {
                black_box(
                    cache
                        .lookup(&ElementType::BACKGROUND_SCENE, &prompt, &params())
                        .await,
                )
            });
        });
    }
    group.finish();
}

fn bench_insert_with_eviction(c: &mut Criterion) {
    let rt = rt();
    let cache = VisualCache::new(CacheConfig::builder().max_entries(1_000).build())
        .expect("build cache");
    let mut counter = 0u64;

    c.bench_function("cache/insert_evicting", |b| {
        b.to_async(&rt).iter(|| {
            counter += 1;
            let prompt = format!("Crowd shot {}", counter);
            let cache = &cache;
            async move {
                let outcome = cache
                    .insert(
                        ElementType::BACKGROUND_SCENE,
                        &prompt,
                        &params(),
                        VisualArtifact::new(prompt.as_str(), 0.5, params()),
                        MetadataOverrides::new(),
                    )
                    .await
                    .expect("insert");
                black_box(outcome.evicted.len())
            }
        });
    });
}

fn bench_search(c: &mut Criterion) {
    let rt = rt();
    let cache = populated(&rt, 5_000);
    let query = CacheQuery::new()
        .project("bench")
        .tag("night")
        .similarity_threshold(0.5);

    c.bench_function("cache/search_5000", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(cache.search(&query).await.total_found) });
    });
}

criterion_group!(
    benches,
    bench_key,
    bench_lookup,
    bench_insert_with_eviction,
    bench_search
);
criterion_main!(benches);

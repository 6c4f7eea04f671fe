use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use termchain_core::EdgeDifficulty::{Easy, Hard, Normal};
use termchain_core::{DifficultyTier, Edge, RouteConfig, Term};
use termchain_game::{select_distractors, GameAssembler, GameRequest, RouteGenerator, RouteRequest};
use termchain_graph::{FxHashSet, GraphCache, InMemoryTermRepository};
use tokio::runtime::Runtime;

/// Ring of `size` terms with chords every 5 and 11 steps, tiers and difficulties rotating.
fn graph(size: i64) -> (Vec<Term>, Vec<Edge>) {
    let terms = (0..size)
        .map(|id| Term::new(id, format!("term-{id}"), (id % 3) as u8 + 1, "bench"))
        .collect();
    let difficulties = [Easy, Normal, Hard];
    let mut edges = Vec::new();
    let mut next_id = 0;
    for id in 0..size {
        for (k, step) in [1, 5, 11].into_iter().enumerate() {
            let d = difficulties[(id as usize + k) % 3];
            edges.push(Edge::new(next_id, id, (id + step) % size, d));
            next_id += 1;
        }
    }
    (terms, edges)
}

fn loaded_cache(rt: &Runtime, size: i64) -> Arc<GraphCache> {
    let (terms, edges) = graph(size);
    let repo = Arc::new(InMemoryTermRepository::new(terms, edges));
    rt.block_on(GraphCache::initialize(repo))
        .expect("bench graph loads")
}

fn bench_route_generation(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("route_generation");
    group.measurement_time(Duration::from_secs(10));

    for &size in &[500i64, 5_000, 50_000] {
        let cache = loaded_cache(&rt, size);
        let routes = RouteGenerator::new(Arc::clone(&cache), RouteConfig::default());
        let snapshot = cache.snapshot().expect("snapshot");

        for difficulty in DifficultyTier::all() {
            let request = RouteRequest::new(20, difficulty);
            group.bench_with_input(
                BenchmarkId::new(format!("{difficulty}"), size),
                &request,
                |b, request| {
                    let mut rng = StdRng::seed_from_u64(17);
                    b.iter(|| {
                        black_box(
                            routes
                                .generate_in(&snapshot, request, &mut rng)
                                .expect("route"),
                        )
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_distractors(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let cache = loaded_cache(&rt, 5_000);
    let snapshot = cache.snapshot().expect("snapshot");
    let visited: FxHashSet<i64> = (0..20).collect();

    c.bench_function("distractors_5000_hard", |b| {
        let mut rng = StdRng::seed_from_u64(3);
        b.iter(|| {
            black_box(select_distractors(
                &snapshot,
                black_box(2_500),
                &visited,
                DifficultyTier::Hard,
                3,
                &mut rng,
            ))
        })
    });
}

fn bench_game_assembly(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let cache = loaded_cache(&rt, 5_000);
    let assembler = GameAssembler::new(cache, RouteConfig::default(), Default::default());
    let request = GameRequest {
        difficulty: DifficultyTier::Normal,
        target_length: Some(20),
        seed: None,
    };

    c.bench_function("start_game_5000_normal", |b| {
        b.iter(|| black_box(assembler.start_game(&request).expect("game")))
    });
}

fn bench_snapshot_build(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let (terms, edges) = graph(20_000);
    let repo = Arc::new(InMemoryTermRepository::new(terms, edges));
    let cache = Arc::new(GraphCache::new(repo));

    c.bench_function("cache_load_20000", |b| {
        b.to_async(&rt).iter(|| async { black_box(cache.load().await.expect("load")) })
    });
}

criterion_group!(
    benches,
    bench_route_generation,
    bench_distractors,
    bench_game_assembly,
    bench_snapshot_build
);
criterion_main!(benches);

//! Benchmarks for query latency against a trained snapshot
//!
//! Run with: cargo bench --package engine

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use data_loader::{Dataset, Link, RawRating};
use engine::{RecommendationEngine, Snapshot};
use trainer::{Trainer, TrainerConfig};

const USERS: u32 = 1_000;
const MOVIES: u32 = 2_000;

fn synthetic_dataset() -> Dataset {
    let links = (1..=MOVIES)
        .map(|movie_id| Link {
            movie_id,
            imdb_id: format!("tt{:07}", movie_id),
        })
        .collect();
    let ratings = (1..=USERS)
        .flat_map(|user_id| {
            (1..=MOVIES)
                .filter(move |movie| (user_id * 13 + movie * 7) % 23 == 0)
                .map(move |movie_id| RawRating {
                    user_id,
                    movie_id,
                    rating: 0.5 + ((user_id + movie_id) % 10) as f32 * 0.5,
                    timestamp: 1_000_000_000 + movie_id as i64,
                })
        })
        .collect();
    Dataset::from_records(links, ratings).expect("synthetic dataset")
}

fn load_engine() -> RecommendationEngine {
    let dataset = synthetic_dataset();
    let model = Trainer::new(TrainerConfig::default().with_factors(32).with_epochs(5))
        .fit(&dataset.matrix)
        .expect("training failed");
    RecommendationEngine::new(Snapshot::from_dataset(&dataset, Some(model)).expect("consistent snapshot"))
}

fn bench_recommend_for_user(c: &mut Criterion) {
    let engine = load_engine();

    c.bench_function("recommend_for_user_top_20", |b| {
        b.iter(|| {
            let recs = engine.recommend_for_user(black_box(1), black_box(20)).unwrap();
            black_box(recs)
        })
    });
}

fn bench_recommend_for_profile(c: &mut Criterion) {
    let engine = load_engine();
    let liked: Vec<String> = (1..=10).map(|i| format!("tt{:07}", i * 23)).collect();

    c.bench_function("recommend_for_profile_10_liked_top_20", |b| {
        b.iter(|| {
            let recs = engine
                .recommend_for_profile(black_box(&liked), black_box(20))
                .unwrap();
            black_box(recs)
        })
    });
}

fn bench_popular(c: &mut Criterion) {
    let engine = load_engine();

    c.bench_function("popular_top_20", |b| {
        b.iter(|| black_box(engine.popular(black_box(20)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_recommend_for_user,
    bench_recommend_for_profile,
    bench_popular
);
criterion_main!(benches);

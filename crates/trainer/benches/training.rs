//! Benchmarks for model training and prediction
//!
//! Run with: cargo bench --package trainer
//!
//! Uses a synthetic rating matrix so the bench does not depend on a
//! downloaded dataset.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use data_loader::{IdentifierMapper, ImdbId, RatingMatrix, RatingRecord};
use trainer::{Trainer, TrainerConfig};

const USERS: u32 = 500;
const MOVIES: u32 = 400;

fn synthetic_matrix(mapper: &IdentifierMapper) -> RatingMatrix {
    let records = (0..USERS).flat_map(|user| {
        (0..MOVIES)
            .filter(move |movie| (user * 31 + movie * 17) % 7 == 0)
            .map(move |movie| RatingRecord {
                user_id: user + 1,
                imdb_id: format!("tt{:07}", movie + 1),
                rating: 0.5 + ((user + movie) % 10) as f32 * 0.5,
                timestamp: 1_000_000_000 + (user * MOVIES + movie) as i64,
            })
    });
    RatingMatrix::build(mapper, records)
}

fn synthetic_mapper() -> IdentifierMapper {
    IdentifierMapper::from_identifiers(
        (1..=MOVIES).map(|i| ImdbId::parse(&format!("tt{:07}", i)).expect("valid id")),
    )
    .expect("unique ids")
}

fn bench_fit(c: &mut Criterion) {
    let mapper = synthetic_mapper();
    let matrix = synthetic_matrix(&mapper);
    let trainer = Trainer::new(TrainerConfig::default().with_factors(32).with_epochs(5));

    c.bench_function("fit_32_factors_5_epochs", |b| {
        b.iter(|| {
            let model = trainer.fit(black_box(&matrix)).expect("training failed");
            black_box(model)
        })
    });
}

fn bench_predict(c: &mut Criterion) {
    let mapper = synthetic_mapper();
    let matrix = synthetic_matrix(&mapper);
    let model = Trainer::new(TrainerConfig::default().with_factors(100).with_epochs(2))
        .fit(&matrix)
        .expect("training failed");

    c.bench_function("predict_all_items_one_user", |b| {
        b.iter(|| {
            let scores: Vec<f32> = model
                .items()
                .filter_map(|(movie, _)| model.predict(black_box(0), movie))
                .collect();
            black_box(scores)
        })
    });
}

criterion_group!(benches, bench_fit, bench_predict);
criterion_main!(benches);

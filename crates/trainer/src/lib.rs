//! # Trainer Crate
//!
//! Offline side of the recommender: fits a biased matrix factorization to a
//! [`RatingMatrix`](data_loader::RatingMatrix) and produces the immutable
//! [`ModelArtifact`] the query engine serves from.
//!
//! ```ignore
//! use trainer::{Trainer, TrainerConfig};
//!
//! let model = Trainer::new(TrainerConfig::default().with_epochs(30)).fit(&dataset.matrix)?;
//! model.save(Path::new("model.json"))?;
//! ```
//!
//! Training is a batch job. It runs on one thread and never touches an
//! artifact that is already in service.

pub mod artifact;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod sgd;

pub use artifact::{ModelArtifact, dot, save_json_atomic, write_json};
pub use config::TrainerConfig;
pub use error::{Result, TrainerError};
pub use evaluation::{
    EvaluationConfig, EvaluationReport, HoldoutSplit, MAE_THRESHOLDS, RMSE_THRESHOLDS, assess,
    chronological_split, evaluate,
};
pub use sgd::Trainer;

//! Biased matrix factorization fitted by stochastic gradient descent.
//!
//! For every observation `(u, i, r)`:
//!
//! ```text
//! e    = r - (mu + b_u + b_i + p_u . q_i)
//! b_u += lr * (e - reg * b_u)
//! b_i += lr * (e - reg * b_i)
//! p_u += lr * (e * q_i - reg * p_u)
//! q_i += lr * (e * p_u - reg * q_i)
//! ```
//!
//! Updates are applied one sample at a time on a single thread, in an order
//! shuffled per epoch by a seeded generator. Same data and config, same model.

use crate::artifact::{ModelArtifact, dot};
use crate::config::TrainerConfig;
use crate::error::{Result, TrainerError};
use chrono::Utc;
use data_loader::{RatingMatrix, UserIdx};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, instrument};

pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit a fresh model artifact to the rating matrix
    #[instrument(skip_all, fields(ratings = matrix.len(), factors = self.config.factors, epochs = self.config.epochs))]
    pub fn fit(&self, matrix: &RatingMatrix) -> Result<ModelArtifact> {
        self.config.validate()?;
        if matrix.is_empty() {
            return Err(TrainerError::EmptyTrainingSet);
        }

        let start = Instant::now();
        let k = self.config.factors;
        let lr = self.config.learning_rate;
        let reg = self.config.regularization;
        let mu = matrix.global_mean();
        let num_users = matrix.num_users();
        let num_items = matrix.num_movies();

        let mut rng = StdRng::seed_from_u64(self.config.seed);

        // Row-major factor matrices, k values per row
        let mut p = self.init_factors(&mut rng, num_users * k);
        let mut q = self.init_factors(&mut rng, num_items * k);
        let mut bu = vec![0.0f32; num_users];
        let mut bi = vec![0.0f32; num_items];

        let ratings = matrix.ratings();
        let mut order: Vec<usize> = (0..ratings.len()).collect();

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut rng);
            let mut squared_error = 0.0f64;

            for &idx in &order {
                let rating = &ratings[idx];
                let u = rating.user as usize;
                let i = rating.movie as usize;
                let pu = &mut p[u * k..(u + 1) * k];
                let qi = &mut q[i * k..(i + 1) * k];

                let err = rating.rating - (mu + bu[u] + bi[i] + dot(pu, qi));
                squared_error += (err as f64) * (err as f64);

                bu[u] += lr * (err - reg * bu[u]);
                bi[i] += lr * (err - reg * bi[i]);
                for f in 0..k {
                    let puf = pu[f];
                    let qif = qi[f];
                    pu[f] += lr * (err * qif - reg * puf);
                    qi[f] += lr * (err * puf - reg * qif);
                }
            }

            debug!(
                epoch,
                train_rmse = (squared_error / ratings.len() as f64).sqrt(),
                "Epoch complete"
            );
        }

        let mut user_factors = BTreeMap::new();
        let mut user_bias = BTreeMap::new();
        for u in 0..num_users {
            if matrix.user_ratings(u as UserIdx).is_empty() {
                continue;
            }
            user_factors.insert(u as UserIdx, p[u * k..(u + 1) * k].to_vec());
            user_bias.insert(u as UserIdx, bu[u]);
        }

        let mut item_factors = BTreeMap::new();
        let mut item_bias = BTreeMap::new();
        for &movie in matrix.movie_stats().keys() {
            let i = movie as usize;
            item_factors.insert(movie, q[i * k..(i + 1) * k].to_vec());
            item_bias.insert(movie, bi[i]);
        }

        let artifact = ModelArtifact::new(
            mu,
            user_factors,
            item_factors,
            user_bias,
            item_bias,
            k,
            Utc::now(),
        )?;

        info!(
            users = artifact.num_users(),
            items = artifact.num_items(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Training complete"
        );
        Ok(artifact)
    }

    fn init_factors(&self, rng: &mut StdRng, len: usize) -> Vec<f32> {
        let spread = self.config.init_std;
        (0..len).map(|_| rng.random_range(-spread..=spread)).collect()
    }
}

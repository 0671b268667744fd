//! Trainer hyperparameters.

use crate::error::{Result, TrainerError};
use serde::{Deserialize, Serialize};

/// Hyperparameters for biased matrix factorization by SGD.
///
/// Every run with the same config and the same rating matrix produces the
/// same model: factors are drawn from a generator seeded with `seed` and the
/// per-epoch shuffle uses the same generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Rank `k` of the factor vectors
    pub factors: usize,
    /// Fixed number of passes over the data
    pub epochs: usize,
    pub learning_rate: f32,
    /// L2 weight shared by biases and factors
    pub regularization: f32,
    /// Factors start uniform in `[-init_std, init_std]`
    pub init_std: f32,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            factors: 100,
            epochs: 20,
            learning_rate: 0.005,
            regularization: 0.02,
            init_std: 0.1,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    /// Configure the factor rank (default: 100)
    pub fn with_factors(mut self, factors: usize) -> Self {
        self.factors = factors;
        self
    }

    /// Configure the epoch count (default: 20)
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Configure the learning rate (default: 0.005)
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Configure the regularization weight (default: 0.02)
    pub fn with_regularization(mut self, regularization: f32) -> Self {
        self.regularization = regularization;
        self
    }

    /// Configure the init spread (default: 0.1)
    pub fn with_init_std(mut self, init_std: f32) -> Self {
        self.init_std = init_std;
        self
    }

    /// Configure the random seed (default: 42)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.factors == 0 {
            return Err(TrainerError::InvalidConfig("factors must be > 0".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainerError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(TrainerError::InvalidConfig(format!(
                "regularization must be non-negative, got {}",
                self.regularization
            )));
        }
        if !(self.init_std.is_finite() && self.init_std >= 0.0) {
            return Err(TrainerError::InvalidConfig(format!(
                "init_std must be non-negative, got {}",
                self.init_std
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TrainerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = TrainerConfig::default()
            .with_factors(8)
            .with_epochs(3)
            .with_seed(7);
        assert_eq!(config.factors, 8);
        assert_eq!(config.epochs, 3);
        assert_eq!(config.seed, 7);
        assert_eq!(config.learning_rate, 0.005);
    }

    #[test]
    fn test_invalid_values() {
        assert!(TrainerConfig::default().with_factors(0).validate().is_err());
        assert!(TrainerConfig::default().with_learning_rate(0.0).validate().is_err());
        assert!(TrainerConfig::default().with_regularization(-1.0).validate().is_err());
        assert!(TrainerConfig::default().with_init_std(f32::NAN).validate().is_err());
    }
}

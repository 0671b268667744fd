//! The trained model artifact.
//!
//! An artifact is a value: built once by the trainer, never mutated, and
//! replaced wholesale when a new training run finishes. Only users and movies
//! that had at least one rating carry factors and biases; everything else is
//! absent, never a zero vector.

use crate::error::{Result, TrainerError};
use chrono::{DateTime, Utc};
use data_loader::{MovieId, UserIdx};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Dot product of two factor vectors
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Serialize `value` as JSON into `writer`, flushing before returning
pub fn write_json<T: Serialize, W: Write>(writer: W, value: &T) -> io::Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()
}

/// Write `value` as JSON to a temporary file beside `path`, then rename it
/// over `path`. Readers see either the old file or the complete new one.
pub fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    write_json(file.as_file_mut(), value)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    global_mean: f32,
    user_factors: BTreeMap<UserIdx, Vec<f32>>,
    item_factors: BTreeMap<MovieId, Vec<f32>>,
    user_bias: BTreeMap<UserIdx, f32>,
    item_bias: BTreeMap<MovieId, f32>,
    k: usize,
    trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Assemble an artifact, checking that every vector has length `k` and
    /// that biases exist exactly for the users and movies with factors.
    pub fn new(
        global_mean: f32,
        user_factors: BTreeMap<UserIdx, Vec<f32>>,
        item_factors: BTreeMap<MovieId, Vec<f32>>,
        user_bias: BTreeMap<UserIdx, f32>,
        item_bias: BTreeMap<MovieId, f32>,
        k: usize,
        trained_at: DateTime<Utc>,
    ) -> Result<Self> {
        let artifact = Self {
            global_mean,
            user_factors,
            item_factors,
            user_bias,
            item_bias,
            k,
            trained_at,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| Err(TrainerError::CorruptArtifact(msg));

        if self.k == 0 {
            return corrupt("rank k is zero".to_string());
        }
        if let Some((u, v)) = self.user_factors.iter().find(|(_, v)| v.len() != self.k) {
            return corrupt(format!("user {} has {} factors, expected {}", u, v.len(), self.k));
        }
        if let Some((i, v)) = self.item_factors.iter().find(|(_, v)| v.len() != self.k) {
            return corrupt(format!("movie {} has {} factors, expected {}", i, v.len(), self.k));
        }
        if !self.user_bias.keys().eq(self.user_factors.keys()) {
            return corrupt("user biases and user factors cover different users".to_string());
        }
        if !self.item_bias.keys().eq(self.item_factors.keys()) {
            return corrupt("item biases and item factors cover different movies".to_string());
        }
        Ok(())
    }

    /// Predicted rating `global_mean + user_bias + item_bias + dot(p_u, q_i)`.
    ///
    /// `None` if either side has no factors.
    pub fn predict(&self, user: UserIdx, movie: MovieId) -> Option<f32> {
        let p = self.user_factors.get(&user)?;
        let q = self.item_factors.get(&movie)?;
        Some(self.global_mean + self.user_bias(user) + self.item_bias(movie) + dot(p, q))
    }

    pub fn global_mean(&self) -> f32 {
        self.global_mean
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn user_factors(&self, user: UserIdx) -> Option<&[f32]> {
        self.user_factors.get(&user).map(Vec::as_slice)
    }

    pub fn item_factors(&self, movie: MovieId) -> Option<&[f32]> {
        self.item_factors.get(&movie).map(Vec::as_slice)
    }

    /// Bias of a user; zero if the user has no factors
    pub fn user_bias(&self, user: UserIdx) -> f32 {
        self.user_bias.get(&user).copied().unwrap_or(0.0)
    }

    /// Bias of a movie; zero if the movie has no factors
    pub fn item_bias(&self, movie: MovieId) -> f32 {
        self.item_bias.get(&movie).copied().unwrap_or(0.0)
    }

    pub fn has_user(&self, user: UserIdx) -> bool {
        self.user_factors.contains_key(&user)
    }

    pub fn has_item(&self, movie: MovieId) -> bool {
        self.item_factors.contains_key(&movie)
    }

    /// Movies with factors, in ascending id order
    pub fn items(&self) -> impl Iterator<Item = (MovieId, &[f32])> {
        self.item_factors.iter().map(|(&id, v)| (id, v.as_slice()))
    }

    /// Users with factors, in ascending index order
    pub fn users(&self) -> impl Iterator<Item = UserIdx> + '_ {
        self.user_factors.keys().copied()
    }

    pub fn num_users(&self) -> usize {
        self.user_factors.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_factors.len()
    }

    /// Write the artifact as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        save_json_atomic(path, self)?;
        info!(path = %path.display(), users = self.num_users(), items = self.num_items(), "Saved model artifact");
        Ok(())
    }

    /// Read and validate an artifact written by [`save`](Self::save)
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = serde_json::from_reader(reader)?;
        artifact.validate()?;
        Ok(artifact)
    }
}

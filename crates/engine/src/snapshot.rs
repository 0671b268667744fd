//! Serving snapshot: everything a query reads, bundled as one value.
//!
//! The identifier table, user history, popularity ranking and model are
//! produced by the same ingestion and training run and are only ever
//! replaced together, so a query can never see a model paired with another
//! run's identifier table.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use data_loader::{Dataset, IdentifierMapper, PopularityIndex, UserDirectory, UserIdx};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;
use trainer::{ModelArtifact, save_json_atomic};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    catalog: IdentifierMapper,
    users: UserDirectory,
    popularity: PopularityIndex,
    model: Option<ModelArtifact>,
    built_at: DateTime<Utc>,
}

impl Snapshot {
    /// Assemble a snapshot, checking that every id it references is in range
    pub fn new(
        catalog: IdentifierMapper,
        users: UserDirectory,
        popularity: PopularityIndex,
        model: Option<ModelArtifact>,
    ) -> Result<Self> {
        let snapshot = Self {
            catalog,
            users,
            popularity,
            model,
            built_at: Utc::now(),
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Snapshot of an ingested dataset, optionally with a model trained on it
    pub fn from_dataset(dataset: &Dataset, model: Option<ModelArtifact>) -> Result<Self> {
        Self::new(
            dataset.mapper.clone(),
            dataset.matrix.user_directory(),
            dataset.popularity.clone(),
            model,
        )
    }

    fn validate(&self) -> Result<()> {
        let num_movies = self.catalog.len();
        let inconsistent = |msg: String| Err(EngineError::InconsistentSnapshot(msg));

        if let Some(id) = self
            .popularity
            .top(self.popularity.len())
            .into_iter()
            .find(|&id| id as usize >= num_movies)
        {
            return inconsistent(format!("popularity ranks unknown movie {}", id));
        }
        for user in 0..self.users.len() as UserIdx {
            if let Some(&id) = self.users.rated(user).iter().find(|&&id| id as usize >= num_movies) {
                return inconsistent(format!("user {} rated unknown movie {}", user, id));
            }
        }

        if let Some(model) = &self.model {
            model.validate()?;
            if let Some((id, _)) = model.items().find(|(id, _)| *id as usize >= num_movies) {
                return inconsistent(format!("model has factors for unknown movie {}", id));
            }
            if let Some(user) = model.users().find(|&u| u as usize >= self.users.len()) {
                return inconsistent(format!("model has factors for unknown user {}", user));
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> &IdentifierMapper {
        &self.catalog
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn popularity(&self) -> &PopularityIndex {
        &self.popularity
    }

    pub fn model(&self) -> Option<&ModelArtifact> {
        self.model.as_ref()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json_atomic(path, self)?;
        info!(
            path = %path.display(),
            movies = self.catalog.len(),
            users = self.users.len(),
            has_model = self.model.is_some(),
            "Saved snapshot"
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: Self = serde_json::from_reader(reader)?;
        snapshot.validate()?;
        info!(
            path = %path.display(),
            movies = snapshot.catalog.len(),
            has_model = snapshot.model.is_some(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{ImdbId, MovieStats};
    use std::collections::{BTreeMap, HashMap};

    fn catalog(n: usize) -> IdentifierMapper {
        IdentifierMapper::from_identifiers(
            (1..=n).map(|i| ImdbId::parse(&format!("tt{:07}", i)).unwrap()),
        )
        .unwrap()
    }

    fn model_with_item(movie: u32) -> ModelArtifact {
        ModelArtifact::new(
            3.0,
            BTreeMap::new(),
            BTreeMap::from([(movie, vec![0.1])]),
            BTreeMap::new(),
            BTreeMap::from([(movie, 0.0)]),
            1,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_model_movie_outside_catalog_is_rejected() {
        let result = Snapshot::new(
            catalog(2),
            UserDirectory::default(),
            PopularityIndex::default(),
            Some(model_with_item(5)),
        );
        assert!(matches!(result, Err(EngineError::InconsistentSnapshot(_))));
    }

    #[test]
    fn test_popularity_outside_catalog_is_rejected() {
        let stats = HashMap::from([(
            9,
            MovieStats {
                avg_rating: 4.0,
                rating_count: 3,
            },
        )]);
        let result = Snapshot::new(
            catalog(2),
            UserDirectory::default(),
            PopularityIndex::build(&stats),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load() {
        let snapshot = Snapshot::new(
            catalog(2),
            UserDirectory::default(),
            PopularityIndex::default(),
            Some(model_with_item(1)),
        )
        .unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        snapshot.save(&path).unwrap();
        let restored = Snapshot::load(&path).unwrap();

        assert_eq!(restored.catalog().len(), 2);
        assert_eq!(restored.model(), snapshot.model());
        assert_eq!(restored.built_at(), snapshot.built_at());
    }

    #[test]
    fn test_overwrite_keeps_a_loadable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        Snapshot::default().save(&path).unwrap();

        let updated = Snapshot::new(
            catalog(2),
            UserDirectory::default(),
            PopularityIndex::default(),
            Some(model_with_item(1)),
        )
        .unwrap();
        updated.save(&path).unwrap();

        assert!(Snapshot::load(&path).unwrap().model().is_some());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("snapshot.json");
        assert!(matches!(
            Snapshot::default().save(&path),
            Err(EngineError::IoError(_))
        ));
    }
}

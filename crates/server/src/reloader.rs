//! Hot reload of the serving snapshot.
//!
//! The snapshot file's modification time is polled; when it changes the
//! file is loaded off the async runtime and installed with a single swap.
//! A file that fails to load leaves the current snapshot in service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use engine::{RecommendationEngine, Snapshot};

pub struct ModelReloader {
    engine: Arc<RecommendationEngine>,
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ModelReloader {
    pub fn new(engine: Arc<RecommendationEngine>, path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            path: path.into(),
            last_modified: None,
        }
    }

    /// Treat the file's current state as already installed
    pub async fn mark_current(&mut self) {
        self.last_modified = self.modified().await;
    }

    async fn modified(&self) -> Option<SystemTime> {
        tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .ok()
    }

    /// Install the snapshot file if it changed since the last check.
    ///
    /// Returns whether a new snapshot was installed.
    pub async fn check_once(&mut self) -> Result<bool> {
        let Some(modified) = self.modified().await else {
            debug!(path = %self.path.display(), "Snapshot file not present");
            return Ok(false);
        };
        if self.last_modified == Some(modified) {
            return Ok(false);
        }

        let path = self.path.clone();
        let snapshot = tokio::task::spawn_blocking(move || Snapshot::load(&path))
            .await
            .context("Snapshot load task panicked")?
            .with_context(|| format!("Failed to load snapshot from {}", self.path.display()))?;

        // Only a successful load moves the marker, so a bad file is retried
        self.last_modified = Some(modified);
        self.engine.install(snapshot);
        info!(path = %self.path.display(), "Reloaded snapshot");
        Ok(true)
    }

    /// Poll every `interval` until the returned task is aborted
    pub fn spawn(mut self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.check_once().await {
                    error!(error = %format!("{:#}", e), "Snapshot reload failed, keeping current snapshot");
                }
            }
        })
    }
}

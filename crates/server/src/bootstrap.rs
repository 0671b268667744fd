use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::ServerConfig;
use data_loader::Dataset;
use engine::Snapshot;

/// The snapshot to start serving with.
///
/// Prefers the trained snapshot at `model_path`. Without one, ingests
/// `data_dir` so popularity can be served until a model arrives; with
/// neither, starts empty.
pub fn initial_snapshot(config: &ServerConfig) -> Result<Snapshot> {
    if config.model_path.exists() {
        return Snapshot::load(&config.model_path).with_context(|| {
            format!("Failed to load snapshot from {}", config.model_path.display())
        });
    }

    match &config.data_dir {
        Some(dir) => {
            info!(
                data_dir = %dir.display(),
                "No trained snapshot yet, serving popularity from dataset"
            );
            let dataset = Dataset::load_from_dir(dir)
                .with_context(|| format!("Failed to load dataset from {}", dir.display()))?;
            Ok(Snapshot::from_dataset(&dataset, None)?)
        }
        None => {
            warn!(
                model_path = %config.model_path.display(),
                "No snapshot and no data directory, starting empty"
            );
            Ok(Snapshot::default())
        }
    }
}

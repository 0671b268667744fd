//! Line-oriented harness for the recommendation service.
//!
//! Boots the service from `MARQUEE_*` configuration, starts the snapshot
//! reloader, then answers commands read from stdin with JSON responses.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use engine::RecommendationEngine;
use server::{Command, ModelReloader, RecommendationService, ServerConfig, initial_snapshot};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Marquee server harness");

    let snapshot = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || initial_snapshot(&config)).await??
    };
    let engine = Arc::new(RecommendationEngine::new(snapshot));
    info!(state = ?engine.state(), "Engine ready");

    let reloader = match config.reload_interval() {
        Some(interval) => {
            let mut reloader = ModelReloader::new(engine.clone(), &config.model_path);
            reloader.mark_current().await;
            Some(reloader.spawn(interval))
        }
        None => None,
    };

    let service = RecommendationService::from_config(&config, engine);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let response = match command {
            Command::User { user_id, limit } => service.recommend_for_user(user_id, limit).await,
            Command::Profile { liked, limit } => service.recommend_for_profile(liked, limit).await,
            Command::Popular { limit } => service.popular(limit).await,
            Command::Quit => break,
        };

        match response {
            Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
            Err(e) => error!(error = %format!("{:#}", e), "Request failed"),
        }
    }

    if let Some(handle) = reloader {
        handle.abort();
    }
    info!("Shutting down");
    Ok(())
}

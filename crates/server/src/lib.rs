//! Server crate for the Marquee recommendation engine.
//!
//! Wires the engine to metadata enrichment, loads configuration, keeps the
//! serving snapshot fresh and exposes the [`RecommendationService`] that
//! answers requests.

pub mod bootstrap;
pub mod command;
pub mod config;
pub mod reloader;
pub mod service;

pub use bootstrap::initial_snapshot;
pub use command::Command;
pub use config::ServerConfig;
pub use reloader::ModelReloader;
pub use service::{MovieRecommendation, RecommendationResponse, RecommendationService};

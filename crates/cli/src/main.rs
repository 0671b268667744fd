use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::{Dataset, UserId, UserIdx};
use engine::{RecommendationEngine, Snapshot};
use futures::stream::{self, StreamExt};
use rand::Rng;
use server::{RecommendationResponse, RecommendationService, ServerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use trainer::{
    EvaluationConfig, MAE_THRESHOLDS, RMSE_THRESHOLDS, Trainer, TrainerConfig, assess,
    chronological_split, evaluate,
};

/// Marquee - Movie Recommendation Engine
#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Movie recommendations from collaborative filtering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Hyperparameters shared by `train` and `evaluate`
#[derive(Args)]
struct TrainingArgs {
    /// Rank of the latent factor vectors
    #[arg(long, default_value = "100")]
    factors: usize,

    /// Passes over the training data
    #[arg(long, default_value = "20")]
    epochs: usize,

    #[arg(long, default_value = "0.005")]
    learning_rate: f32,

    #[arg(long, default_value = "0.02")]
    regularization: f32,

    /// Seed for factor initialization and shuffling
    #[arg(long, default_value = "42")]
    seed: u64,
}

impl TrainingArgs {
    fn config(&self) -> TrainerConfig {
        TrainerConfig::default()
            .with_factors(self.factors)
            .with_epochs(self.epochs)
            .with_learning_rate(self.learning_rate)
            .with_regularization(self.regularization)
            .with_seed(self.seed)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and write the serving snapshot
    Train {
        /// Directory holding links.csv and ratings.csv
        #[arg(long, default_value = "data/ml-latest-small")]
        data_dir: PathBuf,

        /// Snapshot file to write
        #[arg(long, default_value = "models/snapshot.json")]
        output: PathBuf,

        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Get movie recommendations for a user
    Recommend {
        #[arg(long, default_value = "models/snapshot.json")]
        model: PathBuf,

        #[arg(long)]
        user_id: UserId,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Fetch titles and plots from OMDb (needs MARQUEE_OMDB_API_KEY)
        #[arg(long)]
        details: bool,
    },

    /// Get recommendations for a list of liked movies
    Profile {
        #[arg(long, default_value = "models/snapshot.json")]
        model: PathBuf,

        /// Liked movie identifiers, e.g. tt0114709
        #[arg(long, num_args = 1.., required = true)]
        liked: Vec<String>,

        #[arg(long, default_value = "10")]
        limit: usize,

        #[arg(long)]
        details: bool,
    },

    /// Show the most popular movies
    Popular {
        #[arg(long, default_value = "models/snapshot.json")]
        model: PathBuf,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Measure prediction accuracy on a chronological holdout
    Evaluate {
        #[arg(long, default_value = "data/ml-latest-small")]
        data_dir: PathBuf,

        /// Share of the most recent ratings held out for testing
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Users with fewer ratings are left out
        #[arg(long, default_value = "5")]
        min_user_ratings: usize,

        /// List length for hit rate and ARHR
        #[arg(long, default_value = "10")]
        top_n: usize,

        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Run benchmark to test query performance
    Benchmark {
        #[arg(long, default_value = "models/snapshot.json")]
        model: PathBuf,

        /// Number of requests to make
        #[arg(long, default_value = "1000")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data_dir,
            output,
            training,
        } => handle_train(&data_dir, &output, training.config())?,
        Commands::Recommend {
            model,
            user_id,
            limit,
            details,
        } => {
            let service = build_service(&model, details)?;
            let response = service.recommend_for_user(user_id, limit).await?;
            print_response(&response, details);
        }
        Commands::Profile {
            model,
            liked,
            limit,
            details,
        } => {
            let service = build_service(&model, details)?;
            let response = service.recommend_for_profile(liked, limit).await?;
            print_response(&response, details);
        }
        Commands::Popular { model, limit } => {
            let service = build_service(&model, false)?;
            print_response(&service.popular(limit).await?, false);
        }
        Commands::Evaluate {
            data_dir,
            test_fraction,
            min_user_ratings,
            top_n,
            training,
        } => {
            let config = EvaluationConfig::default()
                .with_test_fraction(test_fraction)
                .with_min_user_ratings(min_user_ratings)
                .with_top_n(top_n);
            handle_evaluate(&data_dir, config, training.config())?
        }
        Commands::Benchmark {
            model,
            requests,
            concurrent,
        } => handle_benchmark(&model, requests, concurrent).await?,
    }

    Ok(())
}

fn load_dataset(data_dir: &Path) -> Result<Dataset> {
    println!("Loading MovieLens dataset from {}...", data_dir.display());
    let start = Instant::now();
    let dataset = Dataset::load_from_dir(data_dir).context("Failed to load MovieLens dataset")?;
    println!(
        "{} Loaded {} ratings from {} users over {} movies in {:?}",
        "✓".green(),
        dataset.matrix.len(),
        dataset.matrix.num_users(),
        dataset.mapper.len(),
        start.elapsed()
    );

    let report = dataset.matrix.report();
    let skipped = report.orphans.len() + report.out_of_range + report.invalid_timestamps;
    if skipped > 0 || !dataset.rejected_links.is_empty() {
        println!(
            "{} Skipped {} ratings ({} orphaned) and {} links",
            "!".yellow(),
            skipped,
            report.orphans.len(),
            dataset.rejected_links.len()
        );
    }
    Ok(dataset)
}

fn load_snapshot(path: &Path) -> Result<Snapshot> {
    Snapshot::load(path).with_context(|| {
        format!(
            "Failed to load snapshot from {} (run `marquee train` first)",
            path.display()
        )
    })
}

fn build_service(model: &Path, details: bool) -> Result<RecommendationService> {
    let engine = Arc::new(RecommendationEngine::new(load_snapshot(model)?));
    if !details {
        return Ok(RecommendationService::new(engine, None));
    }

    let config = ServerConfig::from_env()?;
    if config.omdb_api_key().is_none() {
        bail!("--details needs MARQUEE_OMDB_API_KEY to be set");
    }
    Ok(RecommendationService::from_config(&config, engine))
}

/// Handle the 'train' command
fn handle_train(data_dir: &Path, output: &Path, config: TrainerConfig) -> Result<()> {
    let dataset = load_dataset(data_dir)?;

    println!(
        "Training {} factors for {} epochs...",
        config.factors, config.epochs
    );
    let start = Instant::now();
    let model = Trainer::new(config).fit(&dataset.matrix).context("Training failed")?;
    println!(
        "{} Trained factors for {} users and {} movies in {:?}",
        "✓".green(),
        model.num_users(),
        model.num_items(),
        start.elapsed()
    );

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Snapshot::from_dataset(&dataset, Some(model))?
        .save(output)
        .with_context(|| format!("Failed to write snapshot to {}", output.display()))?;
    println!("{} Wrote snapshot to {}", "✓".green(), output.display());
    Ok(())
}

/// Handle the 'evaluate' command
fn handle_evaluate(
    data_dir: &Path,
    config: EvaluationConfig,
    training: TrainerConfig,
) -> Result<()> {
    let dataset = load_dataset(data_dir)?;
    let split = chronological_split(&dataset.matrix, &config)?;

    println!(
        "Training on {} ratings, testing on the {} most recent...",
        split.train.len(),
        split.test.len()
    );
    let model = Trainer::new(training).fit(&split.train)?;
    let report = evaluate(&model, &split, config.top_n);

    println!("{}", "Evaluation Results:".bold().blue());
    println!(
        "{}MAE:  {:.4} ({})",
        "• ".cyan(),
        report.mae,
        assess(report.mae, MAE_THRESHOLDS)
    );
    println!(
        "{}RMSE: {:.4} ({})",
        "• ".cyan(),
        report.rmse,
        assess(report.rmse, RMSE_THRESHOLDS)
    );
    println!("{}Hit rate@{}: {:.4}", "• ".cyan(), config.top_n, report.hit_rate);
    println!("{}ARHR@{}: {:.4}", "• ".cyan(), config.top_n, report.arhr);
    println!(
        "{}Catalog coverage: {:.1}%",
        "• ".cyan(),
        report.catalog_coverage * 100.0
    );
    println!(
        "{}User coverage: {:.1}%",
        "• ".cyan(),
        report.user_coverage * 100.0
    );
    println!("{}Diversity: {:.3}", "• ".cyan(), report.diversity);
    println!("{}Novelty: {:.3}", "• ".cyan(), report.novelty);
    println!(
        "{}Scored {} of {} held-out ratings ({} without factors)",
        "• ".cyan(),
        report.evaluated,
        report.test_size,
        report.uncovered
    );
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(model: &Path, requests: usize, concurrent: usize) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be at least 1");
    }
    let service = build_service(model, false)?;

    let users = service.engine().snapshot().users().clone();
    if users.is_empty() {
        bail!("Snapshot has no users to benchmark with");
    }
    let mut rng = rand::rng();
    let user_ids: Vec<UserId> = (0..requests)
        .map(|_| users.user_id(rng.random_range(0..users.len()) as UserIdx))
        .collect::<Option<_>>()
        .ok_or_else(|| anyhow!("User directory is inconsistent"))?;

    let start = Instant::now();
    let mut timings: Vec<Duration> = stream::iter(user_ids)
        .map(|user_id| {
            let service = service.clone();
            async move {
                let started = Instant::now();
                service.recommend_for_user(user_id, 20).await?;
                Ok::<_, anyhow::Error>(started.elapsed())
            }
        })
        .buffer_unordered(concurrent.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_>>()?;
    let total_time = start.elapsed();

    timings.sort();
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} requests/second",
        requests as f64 / total_time.as_secs_f64()
    );
    Ok(())
}

/// Print a ranked list with its explanation and any warnings
fn print_response(response: &RecommendationResponse, details: bool) {
    println!("{}", "Movie Recommendations:".bold().blue());
    println!("{}", response.message.italic());

    for (rank, movie) in response.movies.iter().enumerate() {
        if details {
            let year = movie.details.year.as_deref().unwrap_or("????");
            println!(
                "{}. {} ({}) [{}] - Score: {:.3}",
                (rank + 1).to_string().green(),
                movie.details.title,
                year,
                movie.imdb_id,
                movie.score
            );
            if let Some(plot) = &movie.details.plot {
                println!("   {}", plot.dimmed());
            }
        } else {
            println!(
                "{}. {} - Score: {:.3}",
                (rank + 1).to_string().green(),
                movie.imdb_id,
                movie.score
            );
        }
    }

    for warning in &response.warnings {
        println!("{} {:?}", "warning:".yellow(), warning);
    }
    for warning in &response.enrichment_warnings {
        println!("{} {:?}", "warning:".yellow(), warning);
    }
}

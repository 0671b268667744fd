use data_loader::Dataset;
use std::path::PathBuf;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,data_loader=info")
        .init();

    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/ml-latest-small"));

    println!("Loading dataset from {}...\n", data_dir.display());

    let start = Instant::now();
    let dataset = Dataset::load_from_dir(&data_dir)?;
    let elapsed = start.elapsed();

    let report = dataset.matrix.report();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {}", dataset.matrix.num_users());
    println!("Movies: {}", dataset.mapper.len());
    println!("Ratings: {}", dataset.matrix.len());
    println!("Global mean: {:.3}", dataset.matrix.global_mean());
    println!(
        "Skipped: {} orphans, {} out of range, {} rejected links",
        report.orphans.len(),
        report.out_of_range,
        dataset.rejected_links.len()
    );
    println!(
        "\nPerformance: {:.0} ratings/second",
        dataset.matrix.len() as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}

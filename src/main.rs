use anyhow::Context;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use dose_tracker::config::parse_timestamp;
use dose_tracker::{save_results, Config, TrackerReport};

#[derive(Parser)]
#[command(name = "dose_tracker")]
#[command(about = "Concentration curves, dose rotation and adherence for an injection protocol")]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Evaluate as of this local time (YYYY-MM-DDTHH:MM:SS) instead of the clock
    #[arg(short, long)]
    now: Option<String>,

    /// Curve horizon in days, overriding the configuration
    #[arg(long)]
    horizon: Option<f64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let now = match &cli.now {
        Some(text) => parse_timestamp(text).with_context(|| format!("Invalid --now value: {}", text))?,
        None => chrono::Local::now().naive_local(),
    };
    info!("Evaluating protocol as of {}", now);

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    info!("Loaded configuration from {:?}", cli.config);

    let horizon = cli.horizon.unwrap_or(config.simulation.horizon_days);
    let report = TrackerReport::build(&config, now, horizon)?;
    info!(
        "{} curve points, {} upcoming doses, {} backfilled misses",
        report.curve.len(),
        report.schedule.len(),
        report.backfill.len()
    );

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("Failed to create output directory {:?}", cli.output))?;

    save_results(&report, &cli.output)?;

    Ok(())
}

mod progress;
mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use strata_core::pipeline::config::JobConfig;
use strata_core::pipeline::run_job_reported;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strata", about = "Stack co-registered rasters into mean and sigma-clipped composites")]
#[command(version)]
struct Cli {
    /// Folder containing the .tif inputs; outputs are written here
    #[arg(long, required_unless_present = "config")]
    folder_path: Option<PathBuf>,

    /// Values strictly above this become missing
    #[arg(long, required_unless_present = "config")]
    threshold_value: Option<f32>,

    /// Sigma multiplier for sigma-clipped stacking
    #[arg(long)]
    sigma_value: Option<f32>,

    /// Write the plain mean aggregate (output_mean.tif)
    #[arg(long)]
    mean_stacking: bool,

    /// Write the sigma-clipped aggregate (output_sigma_clipped.tif)
    #[arg(long)]
    sigma_stacking: bool,

    /// Iteration budget for sigma clipping
    #[arg(long, default_value = "5")]
    iters: usize,

    /// Load the whole job from a TOML config instead of flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = build_config(&cli)?;
    // Surface bad flag combinations before any file is touched
    config.validate()?;

    summary::print_job_summary(&config);

    let reporter = progress::CliReporter::new();
    let output = run_job_reported(&config, &reporter)?;

    summary::print_job_result(&output);
    Ok(())
}

fn build_config(cli: &Cli) -> Result<JobConfig> {
    if let Some(ref path) = cli.config {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        return toml::from_str(&contents).context("Invalid job config");
    }

    Ok(JobConfig {
        // required_unless_present guarantees these when --config is absent
        folder: cli.folder_path.clone().expect("clap enforces --folder-path"),
        threshold: cli.threshold_value,
        mean_stacking: cli.mean_stacking,
        sigma_stacking: cli.sigma_stacking,
        sigma: cli.sigma_value,
        max_iters: cli.iters,
    })
}

//! Evolutionary Parameter Optimizer Binary
//!
//! A CLI tool for searching the rebalancer parameter space against a
//! historical ratio series.

use anyhow::{Context, Result};
use clap::Parser;
use pairbal::application::optimization::optimizer::{
    EvolutionaryOptimizer, OptimizationBudget,
};
use pairbal::application::optimization::reporting::Reporter;
use pairbal::config::OptimizeConfig;
use pairbal::infrastructure::csv_loader::load_ratio_series;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Evolutionary Parameter Optimizer", long_about = None)]
struct Cli {
    /// CSV file with timestamp,ratio columns
    #[arg(short, long)]
    data: PathBuf,

    /// TOML file with search space, fitness weights and engine settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Generation budget (overrides the config file)
    #[arg(short, long)]
    generations: Option<usize>,

    /// Optimizer seed (overrides the config file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Wall-clock budget in seconds; stops between generations
    #[arg(long)]
    max_seconds: Option<u64>,

    /// Number of top candidates to display
    #[arg(short, long, default_value = "10")]
    top_n: usize,

    /// Output JSON file for the full outcome
    #[arg(short, long, default_value = "optimization_results.json")]
    output: String,
}

fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let reporter = Reporter::default();

    let config = if let Some(path) = &cli.config {
        info!("Loading optimizer config from: {}", path.display());
        OptimizeConfig::load(path)?
    } else {
        info!("Using default optimizer config");
        OptimizeConfig::default()
    };

    let generations = cli.generations.unwrap_or(config.generations);
    let seed = cli.seed.unwrap_or(config.seed);

    let series = load_ratio_series(&cli.data)?;
    reporter.print_header(
        "EVOLUTIONARY PARAMETER OPTIMIZER",
        &cli.data.display().to_string(),
        &series,
    );
    reporter.print_space_info(&config.search_space);
    println!(
        "\n🔢 Budget: {} generations x {} candidates (seed {})\n",
        generations, config.population_size, seed
    );

    let optimizer = EvolutionaryOptimizer::new(
        &series,
        config.search_space.clone(),
        config.optimizer_settings(),
    )
    .context("Failed to construct optimizer")?;

    let budget = OptimizationBudget {
        generations,
        max_duration: cli.max_seconds.map(Duration::from_secs),
    };

    println!("🚀 Starting optimization...\n");
    let outcome = optimizer.run(&budget, seed)?;

    reporter.print_results_table(&outcome, cli.top_n);
    reporter.print_best_config(&outcome);
    reporter.export_json(&outcome, &cli.output)?;
    println!("✅ Optimization complete!\n");

    Ok(())
}

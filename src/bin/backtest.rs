//! Backtest Runner Binary
//!
//! Replays a historical A/B ratio series under fixed strategy parameters and
//! prints the performance report.

use anyhow::Result;
use clap::Parser;
use pairbal::application::optimization::reporting::Reporter;
use pairbal::domain::trading::parameters::ParameterSet;
use pairbal::domain::trading::portfolio::Portfolio;
use pairbal::infrastructure::csv_loader::load_ratio_series;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Mean-reversion rebalancer backtest", long_about = None)]
struct Cli {
    /// CSV file with timestamp,ratio columns
    #[arg(short, long)]
    data: PathBuf,

    /// Z-score magnitude that triggers a rebalance
    #[arg(long, default_value = "2.0")]
    z_score_threshold: f64,

    /// Fraction of the sold asset traded per signal
    #[arg(long, default_value = "0.25")]
    rebalance_fraction: f64,

    /// Proportional fee per trade
    #[arg(long, default_value = "0.001")]
    transaction_cost_rate: f64,

    /// Z-score lookback window in observations
    #[arg(long, default_value = "20")]
    lookback_window: usize,

    /// Minimum relative window volatility required to act (0 disables)
    #[arg(long, default_value = "0.0")]
    volatility_filter: f64,

    /// Starting portfolio value in units of B
    #[arg(long, default_value = "10000")]
    initial_value: Decimal,

    /// Fraction of starting value held in A at the first observed ratio
    #[arg(long, default_value = "0.5")]
    initial_split: f64,

    /// Output JSON file for the full result (report, trades, history)
    #[arg(short, long)]
    output: Option<String>,
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

    let series = load_ratio_series(&cli.data)?;
    reporter.print_header(
        "MEAN-REVERSION REBALANCER BACKTEST",
        &cli.data.display().to_string(),
        &series,
    );

    let params = ParameterSet {
        z_score_threshold: cli.z_score_threshold,
        rebalance_fraction: cli.rebalance_fraction,
        transaction_cost_rate: cli.transaction_cost_rate,
        lookback_window: cli.lookback_window,
        volatility_filter: cli.volatility_filter,
    };
    reporter.print_parameters(&params);

    let first_ratio = series.first_ratio().unwrap_or(1.0);
    let initial = Portfolio::from_split(cli.initial_value, cli.initial_split, first_ratio);
    info!(
        amount_a = %initial.amount_a,
        amount_b = %initial.amount_b,
        "initialized portfolio at first observed ratio"
    );

    let result = pairbal::run_backtest(&series, &params, initial)?;
    reporter.print_backtest_summary(&result);

    if let Some(output) = cli.output {
        reporter.export_json(&result, &output)?;
    }

    Ok(())
}

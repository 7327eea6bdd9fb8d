//! Reporting utilities for backtest and optimization results.
//!
//! Provides formatted console output and JSON export capabilities.

use crate::application::backtest::simulator::BacktestResult;
use crate::application::optimization::optimizer::OptimizationOutcome;
use crate::application::optimization::parameter_space::SearchSpace;
use crate::domain::market::PriceSeries;
use crate::domain::performance::report::PerformanceReport;
use crate::domain::trading::parameters::ParameterSet;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Reporter for search and backtest results output.
pub struct Reporter {
    output_dir: String,
}

impl Reporter {
    /// Creates a new reporter with the given output directory.
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.to_string(),
        }
    }

    /// Prints the header banner for a run.
    pub fn print_header(&self, title: &str, data_file: &str, series: &PriceSeries) {
        println!("{}", "=".repeat(80));
        println!("📈 {}", title);
        println!("{}", "=".repeat(80));
        println!("Data:          {}", data_file);
        println!("Observations:  {}", series.len());
        if let (Some(first), Some(last)) = (
            series.observations().first(),
            series.observations().last(),
        ) {
            println!(
                "Period:        {} to {}",
                format_day(first.timestamp),
                format_day(last.timestamp)
            );
        }
        println!("{}", "=".repeat(80));
    }

    /// Prints the search-space bounds.
    pub fn print_space_info(&self, space: &SearchSpace) {
        println!("\n📊 Search Space:");
        for (name, range) in space.dimensions() {
            println!("  {:<22} {:>10.4} .. {:<10.4}", name, range.min, range.max);
        }
    }

    /// Prints one performance report.
    pub fn print_report(&self, report: &PerformanceReport) {
        println!("\n  Total Return:     {:>8.2}%", report.total_return_pct);
        println!("  Benchmark Return: {:>8.2}%", report.benchmark_return_pct);
        println!("  Excess Return:    {:>8.2}%", report.excess_return_pct);
        println!("  Sharpe Ratio:     {:>8.2}", report.sharpe_ratio);
        println!("  Max Drawdown:     {:>8.2}%", report.max_drawdown_pct);
        println!("  Trades:           {:>8}", report.num_trades);
        println!("  Win Rate:         {:>8.1}%", report.win_rate * 100.0);
    }

    /// Prints a formatted table of the top candidates of a finished search.
    pub fn print_results_table(&self, outcome: &OptimizationOutcome, top_n: usize) {
        println!("\n{}", "=".repeat(80));
        println!("✅ OPTIMIZATION COMPLETE - Top {} Candidates", top_n);
        println!("{}", "=".repeat(80));

        println!(
            "{:<4} | {:>9} | {:>8} | {:>8} | {:>8} | {:>8} | {:>10}",
            "#", "Threshold", "Fraction", "Lookback", "VolFilt", "CostRate", "Fitness"
        );
        println!("{}", "-".repeat(80));

        for (i, candidate) in outcome.final_population.iter().take(top_n).enumerate() {
            let p = &candidate.parameters;
            println!(
                "{:<4} | {:>9.3} | {:>8.3} | {:>8} | {:>8.4} | {:>8.4} | {:>10.4}",
                i + 1,
                p.z_score_threshold,
                p.rebalance_fraction,
                p.lookback_window,
                p.volatility_filter,
                p.transaction_cost_rate,
                candidate.fitness
            );
        }

        println!("{}\n", "=".repeat(80));
    }

    /// Prints detailed information about the best configuration.
    pub fn print_best_config(&self, outcome: &OptimizationOutcome) {
        println!("🏆 BEST CONFIGURATION:");
        self.print_parameters(&outcome.best_parameters);
        println!("\n  Fitness:          {:>8.4}", outcome.best_fitness);
        println!("  Confidence:       {:>8.2}", outcome.confidence);
        println!("  Generations:      {:>8}", outcome.generations_completed);
        self.print_report(&outcome.report);
        println!("{}\n", "=".repeat(80));
    }

    pub fn print_parameters(&self, params: &ParameterSet) {
        println!("  Z-Score Threshold:  {:.4}", params.z_score_threshold);
        println!("  Rebalance Fraction: {:.4}", params.rebalance_fraction);
        println!("  Cost Rate:          {:.4}", params.transaction_cost_rate);
        println!("  Lookback Window:    {}", params.lookback_window);
        println!("  Volatility Filter:  {:.4}", params.volatility_filter);
    }

    /// Prints a one-screen summary of a single backtest run.
    pub fn print_backtest_summary(&self, result: &BacktestResult) {
        println!("\n{}", "=".repeat(80));
        println!("✅ BACKTEST COMPLETE");
        println!("{}", "=".repeat(80));
        self.print_report(&result.report);
        println!(
            "\n  Final Holdings:   {:.6} A / {:.6} B",
            result.final_portfolio.amount_a, result.final_portfolio.amount_b
        );
        println!("  Daily Snapshots:  {}", result.daily_history.len());
        println!("{}\n", "=".repeat(80));
    }

    /// Exports any serializable result to a JSON file.
    pub fn export_json<T: Serialize>(&self, payload: &T, filename: &str) -> Result<()> {
        let output_path = if filename.contains('/') || filename.contains('\\') {
            filename.to_string()
        } else {
            format!("{}/{}", self.output_dir, filename)
        };

        // Ensure directory exists
        if let Some(parent) = Path::new(&output_path).parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {:?}", parent))?;
        }

        let json_output =
            serde_json::to_string_pretty(payload).context("Failed to serialize results to JSON")?;

        std::fs::write(&output_path, json_output)
            .context(format!("Failed to write results to {}", output_path))?;

        println!("💾 Results saved to: {}", output_path);
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(".")
    }
}

fn format_day(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

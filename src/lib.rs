pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::backtest::simulator::{BacktestResult, run_backtest};
pub use application::optimization::optimizer::{
    OptimizationBudget, OptimizationOutcome, optimize_parameters,
};

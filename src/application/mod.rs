// Backtest replay engine
pub mod backtest;

// Strategy optimization modules
pub mod optimization;

// Trading decision strategies
pub mod strategies;

mod zscore_rebalance;

pub use zscore_rebalance::{Decision, DecisionEngine};

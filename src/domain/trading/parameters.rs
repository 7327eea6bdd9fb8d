use crate::domain::errors::BacktestError;
use serde::{Deserialize, Serialize};

/// Strategy parameters for the mean-reversion rebalancer.
///
/// Immutable once constructed: the optimizer only ever produces new
/// instances. `validate` enforces the declared bounds before a set is
/// allowed anywhere near a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Z-score magnitude at which a rebalance signal fires. Must be > 0.
    pub z_score_threshold: f64,
    /// Fraction of the asset being sold that is traded per signal, in (0, 1].
    pub rebalance_fraction: f64,
    /// Proportional fee per trade, in [0, 1).
    pub transaction_cost_rate: f64,
    /// Number of trailing observations in the z-score window. At least 1.
    pub lookback_window: usize,
    /// Minimum relative volatility (population stddev / mean) of the window
    /// required for a signal to act. Zero disables the filter.
    pub volatility_filter: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            z_score_threshold: 2.0,
            rebalance_fraction: 0.25,
            transaction_cost_rate: 0.001,
            lookback_window: 20,
            volatility_filter: 0.0,
        }
    }
}

impl ParameterSet {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.z_score_threshold.is_finite() || self.z_score_threshold <= 0.0 {
            return Err(BacktestError::InvalidParameter {
                name: "z_score_threshold",
                value: self.z_score_threshold,
                reason: "must be a positive finite number",
            });
        }
        if !self.rebalance_fraction.is_finite()
            || self.rebalance_fraction <= 0.0
            || self.rebalance_fraction > 1.0
        {
            return Err(BacktestError::InvalidParameter {
                name: "rebalance_fraction",
                value: self.rebalance_fraction,
                reason: "must be in (0, 1]",
            });
        }
        if !self.transaction_cost_rate.is_finite()
            || self.transaction_cost_rate < 0.0
            || self.transaction_cost_rate >= 1.0
        {
            return Err(BacktestError::InvalidParameter {
                name: "transaction_cost_rate",
                value: self.transaction_cost_rate,
                reason: "must be in [0, 1)",
            });
        }
        if self.lookback_window < 1 {
            return Err(BacktestError::InvalidParameter {
                name: "lookback_window",
                value: self.lookback_window as f64,
                reason: "must be at least 1",
            });
        }
        if !self.volatility_filter.is_finite() || self.volatility_filter < 0.0 {
            return Err(BacktestError::InvalidParameter {
                name: "volatility_filter",
                value: self.volatility_filter,
                reason: "must be non-negative and finite",
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_are_valid() {
        assert!(ParameterSet::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let params = ParameterSet {
            z_score_threshold: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_fraction_out_of_range() {
        let params = ParameterSet {
            rebalance_fraction: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = ParameterSet {
            rebalance_fraction: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        // Exactly 1.0 is allowed: sell the whole side
        let params = ParameterSet {
            rebalance_fraction: 1.0,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_rejects_cost_rate_of_one() {
        let params = ParameterSet {
            transaction_cost_rate: 1.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_lookback() {
        let params = ParameterSet {
            lookback_window: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}

use crate::domain::errors::BacktestError;
use crate::domain::trading::parameters::ParameterSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of searchable dimensions in a [`ParameterSet`].
pub const GENE_COUNT: usize = 5;

/// Inclusive bounds for one search dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
}

impl ParameterRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Position of `value` inside the range, in [0, 1]. Degenerate ranges
    /// normalize to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.span() <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / self.span()).clamp(0.0, 1.0)
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.span() <= 0.0 {
            return self.min;
        }
        rng.random_range(self.min..=self.max)
    }
}

/// Declared bounds of the 5-dimensional strategy parameter space.
///
/// Candidates produced by the optimizer are always clipped into these bounds
/// and the integer lookback dimension is rounded, so every candidate passes
/// [`ParameterSet::validate`] by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    pub z_score_threshold: ParameterRange,
    pub rebalance_fraction: ParameterRange,
    pub transaction_cost_rate: ParameterRange,
    pub lookback_window: ParameterRange,
    pub volatility_filter: ParameterRange,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            z_score_threshold: ParameterRange::new(0.5, 4.0),
            rebalance_fraction: ParameterRange::new(0.05, 1.0),
            transaction_cost_rate: ParameterRange::new(0.0005, 0.005),
            lookback_window: ParameterRange::new(5.0, 60.0),
            volatility_filter: ParameterRange::new(0.0, 0.05),
        }
    }
}

impl SearchSpace {
    pub fn validate(&self) -> Result<(), BacktestError> {
        for (name, range) in self.dimensions() {
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(BacktestError::InvalidSearchSpace {
                    name,
                    reason: "bounds must be finite with min <= max",
                });
            }
        }
        if self.z_score_threshold.min <= 0.0 {
            return Err(BacktestError::InvalidSearchSpace {
                name: "z_score_threshold",
                reason: "lower bound must be positive",
            });
        }
        if self.rebalance_fraction.min <= 0.0 || self.rebalance_fraction.max > 1.0 {
            return Err(BacktestError::InvalidSearchSpace {
                name: "rebalance_fraction",
                reason: "bounds must lie in (0, 1]",
            });
        }
        if self.transaction_cost_rate.min < 0.0 || self.transaction_cost_rate.max >= 1.0 {
            return Err(BacktestError::InvalidSearchSpace {
                name: "transaction_cost_rate",
                reason: "bounds must lie in [0, 1)",
            });
        }
        if self.lookback_window.min < 1.0 {
            return Err(BacktestError::InvalidSearchSpace {
                name: "lookback_window",
                reason: "lower bound must be at least 1",
            });
        }
        if self.volatility_filter.min < 0.0 {
            return Err(BacktestError::InvalidSearchSpace {
                name: "volatility_filter",
                reason: "lower bound must be non-negative",
            });
        }

        Ok(())
    }

    pub fn dimensions(&self) -> [(&'static str, ParameterRange); GENE_COUNT] {
        [
            ("z_score_threshold", self.z_score_threshold),
            ("rebalance_fraction", self.rebalance_fraction),
            ("transaction_cost_rate", self.transaction_cost_rate),
            ("lookback_window", self.lookback_window),
            ("volatility_filter", self.volatility_filter),
        ]
    }

    /// Uniform random parameter set inside the bounds.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParameterSet {
        let genes = [
            self.z_score_threshold.sample(rng),
            self.rebalance_fraction.sample(rng),
            self.transaction_cost_rate.sample(rng),
            self.lookback_window.sample(rng),
            self.volatility_filter.sample(rng),
        ];
        self.decode(genes)
    }

    pub fn encode(&self, params: &ParameterSet) -> [f64; GENE_COUNT] {
        [
            params.z_score_threshold,
            params.rebalance_fraction,
            params.transaction_cost_rate,
            params.lookback_window as f64,
            params.volatility_filter,
        ]
    }

    /// Clip a raw gene vector into the bounds and round the integer
    /// dimension, yielding a valid parameter set.
    pub fn decode(&self, genes: [f64; GENE_COUNT]) -> ParameterSet {
        ParameterSet {
            z_score_threshold: self.z_score_threshold.clip(genes[0]),
            rebalance_fraction: self.rebalance_fraction.clip(genes[1]),
            transaction_cost_rate: self.transaction_cost_rate.clip(genes[2]),
            lookback_window: self.lookback_window.clip(genes[3]).round().max(1.0) as usize,
            volatility_filter: self.volatility_filter.clip(genes[4]),
        }
    }

    /// Mean per-dimension normalized distance between two parameter sets,
    /// in [0, 1]. Drives the population-diversity metric.
    pub fn normalized_distance(&self, a: &ParameterSet, b: &ParameterSet) -> f64 {
        let ga = self.encode(a);
        let gb = self.encode(b);
        let ranges = self.dimensions();

        let mut total = 0.0;
        for i in 0..GENE_COUNT {
            let range = ranges[i].1;
            total += (range.normalize(ga[i]) - range.normalize(gb[i])).abs();
        }
        total / GENE_COUNT as f64
    }
}

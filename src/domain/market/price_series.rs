use crate::domain::errors::BacktestError;
use serde::{Deserialize, Serialize};

/// A single observation of the A/B price ratio.
///
/// `ratio` is the price of asset A expressed in units of asset B.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub timestamp: i64,
    pub ratio: f64,
}

/// An ordered, validated price-ratio series.
///
/// Timestamps are strictly increasing and every ratio is a positive finite
/// number. Gaps between timestamps are allowed; missing days simply shrink
/// the effective lookback window and are never interpolated.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    pub fn new(observations: Vec<PriceObservation>) -> Result<Self, BacktestError> {
        for (i, obs) in observations.iter().enumerate() {
            if !obs.ratio.is_finite() || obs.ratio <= 0.0 {
                return Err(BacktestError::InvalidSeries {
                    reason: format!("ratio at index {} is {}, must be positive", i, obs.ratio),
                });
            }
            if i > 0 && obs.timestamp <= observations[i - 1].timestamp {
                return Err(BacktestError::InvalidSeries {
                    reason: format!(
                        "timestamp at index {} ({}) does not increase over previous ({})",
                        i,
                        obs.timestamp,
                        observations[i - 1].timestamp
                    ),
                });
            }
        }

        Ok(Self { observations })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    /// Ratio values in chronological order.
    pub fn ratios(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.ratio).collect()
    }

    pub fn first_ratio(&self) -> Option<f64> {
        self.observations.first().map(|o| o.ratio)
    }

    pub fn last_ratio(&self) -> Option<f64> {
        self.observations.last().map(|o| o.ratio)
    }
}

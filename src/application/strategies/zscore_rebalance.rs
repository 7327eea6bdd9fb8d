use crate::domain::performance::stats::Stats;
use crate::domain::trading::parameters::ParameterSet;
use crate::domain::trading::types::TradeAction;

/// Outcome of one strategy evaluation step.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Raw signal after thresholding and the volatility filter. `None` is a
    /// hold.
    pub signal: Option<TradeAction>,
    pub z_score: f64,
    /// Signal strength in [0, 1]: 0 at the threshold, saturating at 1 once
    /// |z| reaches three times the threshold.
    pub confidence: f64,
    /// True when the signal fired but the side to be sold holds nothing; the
    /// simulator downgrades the step to a hold and records it.
    pub insufficient_balance: bool,
}

impl Decision {
    fn hold(z_score: f64) -> Self {
        Self {
            signal: None,
            z_score,
            confidence: 0.0,
            insufficient_balance: false,
        }
    }
}

/// Z-Score Mean Reversion Rebalancer
///
/// Maps the current A/B ratio, its trailing history, and the portfolio
/// allocation to a rebalancing decision.
/// - z > threshold: A is overvalued versus its trailing mean, reduce A
/// - z < -threshold: A is undervalued, increase A
/// - otherwise hold
///
/// The z-score window excludes the current observation, so a signal is
/// always measured against history the strategy could actually have seen.
pub struct DecisionEngine;

impl DecisionEngine {
    /// Decide what to do at the current step.
    ///
    /// `history` is the full ratio series strictly before the current
    /// observation; the engine looks at its last `lookback_window` entries.
    /// `allocation_a` is the fraction of portfolio value currently held in A.
    pub fn decide(
        current_ratio: f64,
        history: &[f64],
        allocation_a: f64,
        params: &ParameterSet,
    ) -> Decision {
        let z = Stats::z_score(current_ratio, history, params.lookback_window);

        if z.abs() <= params.z_score_threshold {
            return Decision::hold(z);
        }

        // Suppress signals in near-flat markets where the deviation is noise
        if params.volatility_filter > 0.0 && history.len() >= params.lookback_window {
            let window = &history[history.len() - params.lookback_window..];
            if Stats::relative_volatility(window) < params.volatility_filter {
                return Decision::hold(z);
            }
        }

        let action = if z > 0.0 {
            TradeAction::ReduceA
        } else {
            TradeAction::IncreaseA
        };

        let sold_side_empty = match action {
            TradeAction::ReduceA => allocation_a <= 0.0,
            TradeAction::IncreaseA => allocation_a >= 1.0,
        };

        Decision {
            signal: Some(action),
            z_score: z,
            confidence: Self::confidence(z, params.z_score_threshold),
            insufficient_balance: sold_side_empty,
        }
    }

    /// Linear ramp from 0 at |z| = threshold to 1 at |z| = 3 * threshold.
    fn confidence(z: f64, threshold: f64) -> f64 {
        ((z.abs() - threshold) / (2.0 * threshold)).clamp(0.0, 1.0)
    }
}

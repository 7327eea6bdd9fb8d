use crate::domain::performance::report::PerformanceReport;
use serde::{Deserialize, Serialize};

/// Weights and normalization scales of the candidate fitness function.
///
/// Fitness is a weighted sum of normalized total return, normalized Sharpe
/// ratio, inverse normalized max drawdown and win rate, minus a penalty for
/// trade counts outside the target band. The defaults are hand-tuned
/// starting points carried over as configuration, not proven optima.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub total_return: f64,
    pub sharpe: f64,
    pub drawdown: f64,
    pub win_rate: f64,
    pub trade_activity: f64,

    /// Return (in %) that earns the full return score.
    pub return_scale_pct: f64,
    /// Sharpe ratio that earns the full Sharpe score.
    pub sharpe_scale: f64,
    /// Drawdown (in %) at which the drawdown score reaches zero.
    pub drawdown_scale_pct: f64,

    /// Trade-count band considered healthy; counts outside it are penalized
    /// proportionally to the deviation. Discourages both over-trading and
    /// sitting idle.
    pub min_trades: usize,
    pub max_trades: usize,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            total_return: 0.35,
            sharpe: 0.25,
            drawdown: 0.20,
            win_rate: 0.10,
            trade_activity: 0.10,
            return_scale_pct: 20.0,
            sharpe_scale: 3.0,
            drawdown_scale_pct: 30.0,
            min_trades: 4,
            max_trades: 60,
        }
    }
}

impl FitnessWeights {
    /// Scalar fitness of one backtest report. Higher is better.
    pub fn score(&self, report: &PerformanceReport) -> f64 {
        let return_score = (report.total_return_pct / self.return_scale_pct).clamp(-1.0, 1.0);
        let sharpe_score = (report.sharpe_ratio / self.sharpe_scale).clamp(-1.0, 1.0);
        let drawdown_score =
            1.0 - (report.max_drawdown_pct / self.drawdown_scale_pct).clamp(0.0, 1.0);
        let win_score = report.win_rate.clamp(0.0, 1.0);
        let activity_penalty = self.trade_band_penalty(report.num_trades);

        self.total_return * return_score
            + self.sharpe * sharpe_score
            + self.drawdown * drawdown_score
            + self.win_rate * win_score
            - self.trade_activity * activity_penalty
    }

    /// Deviation penalty in [0, 1]: zero inside the band, ramping up with
    /// relative distance outside it.
    fn trade_band_penalty(&self, num_trades: usize) -> f64 {
        if num_trades < self.min_trades {
            let floor = self.min_trades.max(1) as f64;
            (self.min_trades - num_trades) as f64 / floor
        } else if num_trades > self.max_trades {
            let ceiling = self.max_trades.max(1) as f64;
            (((num_trades - self.max_trades) as f64) / ceiling).min(1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(total_return_pct: f64, sharpe: f64, drawdown: f64, trades: usize) -> PerformanceReport {
        PerformanceReport {
            total_return_pct,
            benchmark_return_pct: 0.0,
            excess_return_pct: total_return_pct,
            sharpe_ratio: sharpe,
            max_drawdown_pct: drawdown,
            num_trades: trades,
            win_rate: 0.5,
        }
    }

    #[test]
    fn test_better_return_scores_higher() {
        let weights = FitnessWeights::default();
        let low = weights.score(&report(2.0, 1.0, 10.0, 10));
        let high = weights.score(&report(15.0, 1.0, 10.0, 10));
        assert!(high > low);
    }

    #[test]
    fn test_drawdown_is_penalized() {
        let weights = FitnessWeights::default();
        let calm = weights.score(&report(10.0, 1.0, 5.0, 10));
        let wild = weights.score(&report(10.0, 1.0, 25.0, 10));
        assert!(calm > wild);
    }

    #[test]
    fn test_trade_band_penalizes_both_extremes() {
        let weights = FitnessWeights::default();
        let in_band = weights.score(&report(10.0, 1.0, 10.0, 10));
        let idle = weights.score(&report(10.0, 1.0, 10.0, 0));
        let churning = weights.score(&report(10.0, 1.0, 10.0, 500));

        assert!(in_band > idle, "under-trading must cost fitness");
        assert!(in_band > churning, "over-trading must cost fitness");
    }

    #[test]
    fn test_normalization_saturates() {
        let weights = FitnessWeights::default();
        let big = weights.score(&report(1e6, 100.0, 0.0, 10));
        let merely_great = weights.score(&report(weights.return_scale_pct, weights.sharpe_scale, 0.0, 10));
        assert!((big - merely_great).abs() < 1e-12);
    }

    #[test]
    fn test_no_trades_penalty_is_bounded() {
        let weights = FitnessWeights::default();
        assert!((weights.trade_band_penalty(0) - 1.0).abs() < 1e-12);
        assert_eq!(weights.trade_band_penalty(10), 0.0);
        assert_eq!(weights.trade_band_penalty(usize::MAX), 1.0);
    }
}

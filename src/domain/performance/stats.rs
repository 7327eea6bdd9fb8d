use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::Statistics;

/// Z-score reported when the trailing window has zero variance but the
/// current value breaks away from it. The deviation is unbounded in
/// standard-deviation terms, so it is capped at a large finite score to keep
/// downstream arithmetic safe.
pub const FLAT_WINDOW_BREAKOUT_Z: f64 = 1.0e4;

/// Shared statistics utilities for the rebalancer.
pub struct Stats;

impl Stats {
    /// Rolling z-score of `current` against the trailing window of
    /// `history`.
    ///
    /// The window is the last `lookback` elements of `history`, which the
    /// caller supplies exclusive of the current observation (no look-ahead).
    /// Returns 0.0 when the history is shorter than the window or when the
    /// window is flat and the current value sits on it; a break away from a
    /// flat window saturates at [`FLAT_WINDOW_BREAKOUT_Z`]. The result is
    /// always finite.
    pub fn z_score(current: f64, history: &[f64], lookback: usize) -> f64 {
        if lookback == 0 || history.len() < lookback {
            return 0.0;
        }

        let window = &history[history.len() - lookback..];
        let mean = window.mean();
        // Population stddev (divide by N), matching the z-score definition
        let std_dev = window.population_std_dev();

        if std_dev == 0.0 || !std_dev.is_finite() {
            let deviation = current - mean;
            if deviation.abs() <= f64::EPSILON * mean.abs().max(1.0) {
                return 0.0;
            }
            return deviation.signum() * FLAT_WINDOW_BREAKOUT_Z;
        }

        let z = (current - mean) / std_dev;
        if z.is_finite() { z } else { 0.0 }
    }

    /// Relative volatility of a window: population stddev divided by the
    /// absolute mean. Zero for flat, empty, or zero-mean windows.
    pub fn relative_volatility(window: &[f64]) -> f64 {
        if window.len() < 2 {
            return 0.0;
        }

        let mean = window.mean();
        if mean == 0.0 || !mean.is_finite() {
            return 0.0;
        }

        let std_dev = window.population_std_dev();
        let vol = std_dev / mean.abs();
        if vol.is_finite() { vol } else { 0.0 }
    }

    /// Simple returns of consecutive equity values. Entries with a
    /// non-positive predecessor are skipped.
    pub fn daily_returns(equity: &[Decimal]) -> Vec<f64> {
        let mut returns = Vec::new();
        for i in 1..equity.len() {
            let prev = equity[i - 1];
            let curr = equity[i];

            if prev > Decimal::ZERO {
                let r = (curr - prev)
                    .checked_div(prev)
                    .and_then(|r| r.to_f64())
                    .unwrap_or(0.0);
                returns.push(r);
            }
        }
        returns
    }

    /// Annualized Sharpe ratio of a return series:
    /// mean / stddev * sqrt(periods_per_year).
    ///
    /// Defined as 0.0 for fewer than two returns or a zero-volatility series;
    /// flat synthetic data is a common test input and must not blow up.
    pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let mean = returns.mean();
        let std_dev = returns.std_dev();

        if std_dev == 0.0 || !std_dev.is_finite() {
            return 0.0;
        }

        let sharpe = mean / std_dev * periods_per_year.sqrt();
        if sharpe.is_finite() { sharpe } else { 0.0 }
    }

    /// Largest peak-to-trough decline of an equity curve, as a positive
    /// percentage of the peak.
    pub fn max_drawdown_pct(equity: &[Decimal]) -> f64 {
        let mut peak = f64::MIN;
        let mut max_dd = 0.0;

        for value in equity {
            let v = value.to_f64().unwrap_or(0.0);
            if v > peak {
                peak = v;
            } else if peak > 0.0 {
                let dd = (peak - v) / peak * 100.0;
                if dd > max_dd {
                    max_dd = dd;
                }
            }
        }

        max_dd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_z_score_of_flat_window_is_exactly_zero() {
        let history = vec![1.0; 30];
        assert_eq!(Stats::z_score(1.0, &history, 20), 0.0);
    }

    #[test]
    fn test_break_from_flat_window_saturates() {
        let history = vec![1.0; 30];
        assert_eq!(
            Stats::z_score(1.5, &history, 20),
            FLAT_WINDOW_BREAKOUT_Z
        );
        assert_eq!(
            Stats::z_score(0.5, &history, 20),
            -FLAT_WINDOW_BREAKOUT_Z
        );
    }

    #[test]
    fn test_z_score_insufficient_history_is_zero() {
        let history = vec![1.0, 1.1, 0.9];
        assert_eq!(Stats::z_score(2.0, &history, 10), 0.0);
    }

    #[test]
    fn test_z_score_positive_above_mean() {
        // Window mean 1.0, population stddev 0.1
        let history = vec![0.9, 1.1, 0.9, 1.1];
        let z = Stats::z_score(1.3, &history, 4);
        assert!(z > 0.0, "z-score should be positive, got {}", z);

        let z_low = Stats::z_score(0.7, &history, 4);
        assert!(z_low < 0.0, "z-score should be negative, got {}", z_low);
    }

    #[test]
    fn test_z_score_uses_trailing_window_only() {
        // Early garbage outside the window must not influence the result
        let mut history = vec![100.0; 50];
        history.extend(vec![1.0, 1.2, 0.8, 1.0, 1.1, 0.9, 1.0, 1.1, 0.9, 1.0]);

        let z = Stats::z_score(1.0, &history, 10);
        assert!(z.abs() < 1.0, "window should exclude the early values");
    }

    #[test]
    fn test_z_score_is_always_finite() {
        let z = Stats::z_score(f64::MAX, &[1.0, 2.0, 3.0], 3);
        assert!(z.is_finite());
    }

    #[test]
    fn test_sharpe_zero_for_flat_returns() {
        let returns = vec![0.01, 0.01, 0.01];
        assert_eq!(Stats::sharpe_ratio(&returns, 365.0), 0.0);
    }

    #[test]
    fn test_sharpe_positive_for_positive_drift() {
        let returns = vec![0.01, 0.02, 0.01, 0.02];
        assert!(Stats::sharpe_ratio(&returns, 365.0) > 0.0);
    }

    #[test]
    fn test_max_drawdown() {
        let equity = vec![dec!(100), dec!(120), dec!(90), dec!(110)];
        let dd = Stats::max_drawdown_pct(&equity);
        // Peak 120 -> trough 90 = 25%
        assert!((dd - 25.0).abs() < 1e-9, "drawdown was {}", dd);
    }

    #[test]
    fn test_max_drawdown_of_rising_curve_is_zero() {
        let equity = vec![dec!(100), dec!(101), dec!(102)];
        assert_eq!(Stats::max_drawdown_pct(&equity), 0.0);
    }

    #[test]
    fn test_daily_returns() {
        let equity = vec![dec!(100), dec!(110), dec!(99)];
        let returns = Stats::daily_returns(&equity);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_relative_volatility_flat_is_zero() {
        assert_eq!(Stats::relative_volatility(&[2.0, 2.0, 2.0]), 0.0);
        assert!(Stats::relative_volatility(&[1.0, 1.5, 0.5]) > 0.0);
    }
}

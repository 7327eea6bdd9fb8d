use crate::domain::performance::stats::Stats;
use crate::domain::trading::types::TradeRecord;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Trading periods per year used for Sharpe annualization. The ratio series
/// is daily and crypto pairs trade every calendar day.
pub const PERIODS_PER_YEAR: f64 = 365.0;

/// Performance summary of one backtest run.
///
/// Derived fresh from the full equity curve and trade log of a run, never
/// partially updated. `win_rate` is a fraction in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub total_return_pct: f64,
    pub benchmark_return_pct: f64,
    pub excess_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    pub num_trades: usize,
    pub win_rate: f64,
}

impl PerformanceReport {
    /// Compute the report for a completed run.
    ///
    /// `equity` is the per-step portfolio value series, `benchmark_final` the
    /// end value of a static hold of the initial amounts (no trades, no
    /// fees). A trade counts as a win when the portfolio value at the next
    /// trade (or the final value, for the last trade) exceeds its post-trade
    /// value.
    pub fn from_run(
        initial_value: Decimal,
        equity: &[Decimal],
        benchmark_final: Decimal,
        trades: &[TradeRecord],
    ) -> Self {
        let final_value = equity.last().copied().unwrap_or(initial_value);

        let total_return_pct = percent_change(initial_value, final_value);
        let benchmark_return_pct = percent_change(initial_value, benchmark_final);
        let excess_return_pct = total_return_pct - benchmark_return_pct;

        let returns = Stats::daily_returns(equity);
        let sharpe_ratio = Stats::sharpe_ratio(&returns, PERIODS_PER_YEAR);
        let max_drawdown_pct = Stats::max_drawdown_pct(equity);

        let num_trades = trades.len();
        let mut wins = 0usize;
        for (i, trade) in trades.iter().enumerate() {
            let outcome_value = trades
                .get(i + 1)
                .map(|next| next.value_before)
                .unwrap_or(final_value);
            if outcome_value > trade.value_after {
                wins += 1;
            }
        }
        let win_rate = if num_trades > 0 {
            wins as f64 / num_trades as f64
        } else {
            0.0
        };

        Self {
            total_return_pct,
            benchmark_return_pct,
            excess_return_pct,
            sharpe_ratio,
            max_drawdown_pct,
            num_trades,
            win_rate,
        }
    }
}

fn percent_change(from: Decimal, to: Decimal) -> f64 {
    if from.is_zero() {
        return 0.0;
    }

    (to - from)
        .checked_div(from)
        .map(|r| r * Decimal::from(100))
        .and_then(|r| r.to_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::types::TradeAction;
    use rust_decimal_macros::dec;

    fn trade(value_before: Decimal, value_after: Decimal) -> TradeRecord {
        TradeRecord {
            timestamp: 0,
            action: TradeAction::ReduceA,
            amount_a: dec!(1),
            amount_b: dec!(1),
            fees_paid: dec!(0),
            z_score: 0.0,
            value_before,
            value_after,
        }
    }

    #[test]
    fn test_flat_equity_yields_zero_everything() {
        let equity = vec![dec!(100); 10];
        let report = PerformanceReport::from_run(dec!(100), &equity, dec!(100), &[]);

        assert_eq!(report.total_return_pct, 0.0);
        assert_eq!(report.benchmark_return_pct, 0.0);
        assert_eq!(report.sharpe_ratio, 0.0);
        assert_eq!(report.max_drawdown_pct, 0.0);
        assert_eq!(report.num_trades, 0);
        assert_eq!(report.win_rate, 0.0);
    }

    #[test]
    fn test_excess_return_is_total_minus_benchmark() {
        let equity = vec![dec!(100), dec!(105), dec!(110)];
        let report = PerformanceReport::from_run(dec!(100), &equity, dec!(104), &[]);

        assert!((report.total_return_pct - 10.0).abs() < 1e-9);
        assert!((report.benchmark_return_pct - 4.0).abs() < 1e-9);
        assert!((report.excess_return_pct - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_win_rate_compares_against_next_trade_value() {
        // First trade: value grew to 108 before the second trade -> win.
        // Second trade: final value 103 is below 107 -> loss.
        let equity = vec![dec!(100), dec!(108), dec!(103)];
        let trades = vec![trade(dec!(100), dec!(99)), trade(dec!(108), dec!(107))];
        let report = PerformanceReport::from_run(dec!(100), &equity, dec!(100), &trades);

        assert_eq!(report.num_trades, 2);
        assert!((report.win_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_initial_value_degenerates_to_zero() {
        let report = PerformanceReport::from_run(dec!(0), &[dec!(0)], dec!(0), &[]);
        assert_eq!(report.total_return_pct, 0.0);
    }
}
